//! Error types for ARC operations

use std::io;
use std::path::PathBuf;

use mtf_data::DataError;
use thiserror::Error;

/// Result type for ARC operations
pub type Result<T> = std::result::Result<T, ArcError>;

/// Error types for ARC operations
#[derive(Error, Debug)]
pub enum ArcError {
    /// Layout problem reported by the schema engine
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Not an ARC archive (magic {0:?})")]
    WrongMagic(String),

    /// Source rejected by the denylist before any processing
    #[error("Unsupported input {path}: matches denylist pattern `{pattern}`")]
    UnsupportedInput { path: PathBuf, pattern: String },

    /// Member path that would escape the destination directory
    #[error("Unsafe member path: {0}")]
    UnsafePath(String),

    /// Member path that cannot be stored in the fixed-size name field
    #[error("Path {path:?} cannot be stored: {reason}")]
    PathEncoding { path: String, reason: &'static str },

    #[error("No type hash known for extension `{0}`")]
    UnknownExtension(String),

    #[error("Member {path} is {size} bytes, more than the {limit} byte limit")]
    MemberTooLarge { path: String, size: usize, limit: u32 },

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Invalid denylist pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl ArcError {
    pub(crate) fn path_encoding(path: &str, reason: &'static str) -> Self {
        Self::PathEncoding {
            path: path.to_owned(),
            reason,
        }
    }
}
