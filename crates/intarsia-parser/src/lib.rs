//! TypeScript scanning, reference resolution, and transform entry points.
//!
//! The pipeline: [`scan`] turns one file into a [`ScannedFile`] of plain
//! indexes over its syntax tree, [`resolve`] walks the requested type names
//! through those indexes (loading further files through [`loader`]), and
//! [`transform`] drives the whole thing for a script region or a component
//! file and splices the result back.

pub mod error;
pub mod loader;
pub mod resolve;
pub mod scan;
pub mod syntax;
pub mod transform;

pub use error::ExtractError;
pub use loader::{AliasEntry, FsReader, ModuleLoader, SourceReader};
pub use resolve::{Resolver, TypeRequest};
pub use scan::{scan, RootRequest, ScannedFile};
pub use transform::{extract_types, transform_script, transform_sfc, TransformOptions};
