use mtf_data::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmtError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected magic value {0:?}, expected \"LMT\"")]
    WrongMagic(String),

    /// A track declares more samples than any real animation carries
    #[error("Track for bone {bone} in block {block} has {samples} samples, limit is {limit}")]
    SampleCeiling {
        block: usize,
        bone: u8,
        samples: usize,
        limit: usize,
    },
}

pub type Result<T> = std::result::Result<T, LmtError>;
