//! zlib member payloads

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::{debug, trace};

use crate::error::{ArcError, Result};

pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::with_capacity(expected_size);
    decoder.read_to_end(&mut decompressed).map_err(|e| {
        debug!("zlib decompression failed: {e}");
        trace!("First 16 bytes of data: {:02X?}", &data[..16.min(data.len())]);
        ArcError::Compression(format!("zlib: {e}"))
    })?;
    if decompressed.len() != expected_size {
        debug!(
            "Decompressed size mismatch: expected {}, got {}",
            expected_size,
            decompressed.len()
        );
    }
    Ok(decompressed)
}

pub(crate) fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder
        .write_all(data)
        .map_err(|e| ArcError::Compression(format!("zlib: {e}")))?;
    encoder
        .finish()
        .map_err(|e| ArcError::Compression(format!("zlib: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress() {
        let data = b"MOD\0MOD\0MOD\0MOD\0MOD\0MOD\0MOD\0MOD\0".repeat(16);
        let packed = compress(&data, 6).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(packed[0], 0x78);
        assert_eq!(decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_corrupt_stream() {
        assert!(matches!(
            decompress(&[0x78, 0x9c, 0xff, 0xff, 0xff], 10),
            Err(ArcError::Compression(_))
        ));
    }
}
