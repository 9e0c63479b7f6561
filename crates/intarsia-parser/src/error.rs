use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal extraction faults. Unresolved names and unresolvable module
/// specifiers are not errors; they leave the source untouched instead.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed source in {path}")]
    Parse { path: PathBuf },

    #[error("duplicate declaration of `{name}` in {path}")]
    DuplicateDeclaration { name: String, path: PathBuf },
}
