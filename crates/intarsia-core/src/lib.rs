//! Core data model and splicing engine for intarsia.
//!
//! Everything here is pure and I/O-free: spans, declarations, the shared
//! extraction session, the dependency/inheritance ordering, and the final
//! splice that assembles the inlined type block and the source edits. File
//! loading and syntax-tree work live in `intarsia-parser`.

pub mod decl;
pub mod graph;
pub mod imports;
pub mod naming;
pub mod session;
pub mod span;
pub mod splice;

pub use decl::{DeclBody, DeclKey, DeclKind, Declaration};
pub use session::{RootBinding, Session};
pub use span::{LocalSpan, SourceEdit, Span};
pub use splice::{EntryContext, SpliceOutput};
