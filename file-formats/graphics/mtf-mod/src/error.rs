use mtf_data::DataError;
use thiserror::Error;

/// Errors raised while reading or writing models
#[derive(Debug, Error)]
pub enum ModError {
    /// Layout problem reported by the schema engine
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected magic value {0:?}, expected \"MOD\"")]
    WrongMagic(String),

    /// A single mesh references more bones than one palette can hold
    #[error("Mesh {mesh} is influenced by {bones} bones, a palette holds at most {limit}")]
    TooManyInfluences {
        mesh: usize,
        bones: usize,
        limit: usize,
    },

    /// Texture path that does not fit the fixed ASCII path field
    #[error("Texture path {path:?} {reason}")]
    PathEncoding { path: String, reason: &'static str },

    /// Export input that cannot be expressed in the container
    #[error("Cannot export mesh {mesh}: {reason}")]
    InvalidMesh { mesh: usize, reason: String },
}

impl ModError {
    pub(crate) fn invalid_mesh(mesh: usize, reason: impl Into<String>) -> Self {
        Self::InvalidMesh {
            mesh,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModError>;
