use mtf_data::DataError;
use thiserror::Error;

/// Errors raised while reading, writing or converting textures
#[derive(Debug, Error)]
pub enum TexError {
    /// Layout problem reported by the schema engine
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Leading tag does not match the expected container
    #[error("Unexpected magic value {found:?}, expected {expected:?}")]
    WrongMagic {
        found: String,
        expected: &'static str,
    },

    /// Compression tag or pixel layout without a converter, or a source
    /// image without mip levels
    #[error("Unsupported texture format: {0}")]
    UnsupportedFormat(String),
}

impl TexError {
    pub(crate) fn wrong_magic(found: &[u8], expected: &'static str) -> Self {
        Self::WrongMagic {
            found: String::from_utf8_lossy(found).into_owned(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, TexError>;
