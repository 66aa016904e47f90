//! Command implementations for each file format

pub mod arc;
pub mod info;
pub mod lmt;
pub mod model;
pub mod sbc;
pub mod tex;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;

/// Read a whole input file.
pub(crate) fn read_input(path: &Path) -> Result<Bytes> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Bytes::from(data))
}

pub(crate) fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

/// `output`, or `input` with its extension replaced.
pub(crate) fn output_path(input: &Path, output: Option<&Path>, extension: &str) -> PathBuf {
    output.map_or_else(|| input.with_extension(extension), Path::to_path_buf)
}
