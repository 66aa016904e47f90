use std::fmt;

use mtf_data::DataError;

/// Engine tag for 32-bit uncompressed pixels
pub const UNCOMPRESSED_TAG: [u8; 4] = [0x15, 0, 0, 0];

/// Pixel layouts a texture payload can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 32-bit RGBA, 8 bits per channel
    Rgba8,
    Dxt1,
    Dxt3,
    Dxt5,
    /// Single channel block compression (BC4)
    Ati1,
    /// Two channel block compression (BC5)
    Ati2,
}

impl PixelFormat {
    pub fn from_four_cc(four_cc: [u8; 4]) -> Option<Self> {
        match &four_cc {
            b"DXT1" => Some(Self::Dxt1),
            b"DXT3" => Some(Self::Dxt3),
            b"DXT5" => Some(Self::Dxt5),
            b"ATI1" | b"BC4U" => Some(Self::Ati1),
            b"ATI2" | b"BC5U" => Some(Self::Ati2),
            _ => None,
        }
    }

    /// Block compression code, `None` for uncompressed pixels.
    pub fn four_cc(self) -> Option<[u8; 4]> {
        match self {
            Self::Rgba8 => None,
            Self::Dxt1 => Some(*b"DXT1"),
            Self::Dxt3 => Some(*b"DXT3"),
            Self::Dxt5 => Some(*b"DXT5"),
            Self::Ati1 => Some(*b"ATI1"),
            Self::Ati2 => Some(*b"ATI2"),
        }
    }

    pub fn from_tex_tag(tag: [u8; 4]) -> Option<Self> {
        if tag == UNCOMPRESSED_TAG {
            Some(Self::Rgba8)
        } else {
            Self::from_four_cc(tag)
        }
    }

    pub fn tex_tag(self) -> [u8; 4] {
        self.four_cc().unwrap_or(UNCOMPRESSED_TAG)
    }

    pub fn is_compressed(self) -> bool {
        self != Self::Rgba8
    }

    /// Bytes per 4×4 block
    pub fn block_size(self) -> Option<usize> {
        match self {
            Self::Rgba8 => None,
            Self::Dxt1 | Self::Ati1 => Some(8),
            Self::Dxt3 | Self::Dxt5 | Self::Ati2 => Some(16),
        }
    }

    /// Byte size of mip `level` of a `width`×`height` image.
    ///
    /// Levels past the last one clamp to a single pixel.
    pub fn level_size(self, width: u32, height: u32, level: u32) -> usize {
        let w = width.checked_shr(level).unwrap_or(0).max(1) as usize;
        let h = height.checked_shr(level).unwrap_or(0).max(1) as usize;
        match self.block_size() {
            Some(block) => w.div_ceil(4).max(1) * h.div_ceil(4).max(1) * block,
            None => w * h * 4,
        }
    }

    /// Byte size of a full chain of `mip_count` levels for one image.
    pub fn chain_size(self, width: u32, height: u32, mip_count: u32) -> usize {
        (0..mip_count)
            .map(|level| self.level_size(width, height, level))
            .sum()
    }
}

/// Longest mip chain a `width`×`height` image can have: down to 1×1.
pub fn max_mip_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Reject a declared mip count that a `width`×`height` image cannot hold.
pub fn check_mip_count(context: &str, width: u32, height: u32, mip_count: u32) -> mtf_data::Result<()> {
    let limit = max_mip_count(width, height);
    if mip_count > limit {
        return Err(DataError::malformed(
            context,
            format!("{mip_count} mip levels declared, a {width}x{height} image has at most {limit}"),
        ));
    }
    Ok(())
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.four_cc() {
            Some(code) => write!(f, "{}", String::from_utf8_lossy(&code)),
            None => write!(f, "RGBA8"),
        }
    }
}

/// Printable form of a raw four byte tag.
pub fn tag_to_string(tag: &[u8; 4]) -> String {
    if tag.iter().all(|b| b.is_ascii_graphic() || *b == 0) {
        mtf_data::types::magic_to_string(tag)
    } else {
        format!("0x{:08x}", u32::from_le_bytes(*tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(PixelFormat::Dxt1, 4, 4, 0 => 8; "dxt1 single block")]
    #[test_case(PixelFormat::Dxt5, 4, 4, 0 => 16; "dxt5 single block")]
    #[test_case(PixelFormat::Dxt1, 256, 128, 0 => 64 * 32 * 8; "dxt1 base level")]
    #[test_case(PixelFormat::Dxt1, 256, 128, 8 => 8; "dxt1 clamps to one block")]
    #[test_case(PixelFormat::Ati2, 6, 6, 0 => 4 * 16; "partial blocks round up")]
    #[test_case(PixelFormat::Rgba8, 16, 8, 0 => 512; "rgba base level")]
    #[test_case(PixelFormat::Rgba8, 16, 8, 4 => 4; "rgba clamps to one pixel")]
    fn test_level_size(format: PixelFormat, width: u32, height: u32, level: u32) -> usize {
        format.level_size(width, height, level)
    }

    #[test_case(PixelFormat::Dxt1, 4, 4, 32 => 8; "level of 32 clamps")]
    #[test_case(PixelFormat::Rgba8, 1024, 1024, 200 => 4; "far past the chain")]
    fn test_level_size_past_shift_width(format: PixelFormat, width: u32, height: u32, level: u32) -> usize {
        format.level_size(width, height, level)
    }

    #[test_case(1, 1 => 1)]
    #[test_case(4, 4 => 3)]
    #[test_case(256, 128 => 9)]
    #[test_case(5, 3 => 3)]
    #[test_case(0, 0 => 1)]
    #[test_case(u32::MAX, 1 => 32)]
    fn test_max_mip_count(width: u32, height: u32) -> u32 {
        max_mip_count(width, height)
    }

    #[test]
    fn test_check_mip_count() {
        assert!(check_mip_count("DDS", 4, 4, 3).is_ok());
        let err = check_mip_count("DDS", 4, 4, 4).unwrap_err();
        assert!(err.is_malformed(), "{err}");
    }

    #[test]
    fn test_tags() {
        assert_eq!(PixelFormat::from_tex_tag(UNCOMPRESSED_TAG), Some(PixelFormat::Rgba8));
        assert_eq!(PixelFormat::from_tex_tag(*b"DXT5"), Some(PixelFormat::Dxt5));
        assert_eq!(PixelFormat::from_tex_tag(*b"BC7X"), None);
        assert_eq!(PixelFormat::Rgba8.tex_tag(), UNCOMPRESSED_TAG);
        assert_eq!(PixelFormat::Ati1.tex_tag(), *b"ATI1");
        assert_eq!(tag_to_string(&UNCOMPRESSED_TAG), "0x00000015");
        assert_eq!(tag_to_string(b"DXT1"), "DXT1");
    }

    #[test]
    fn test_chain_size() {
        // 8x8 DXT1: 4 blocks, 1 block, 1 block, 1 block
        assert_eq!(PixelFormat::Dxt1.chain_size(8, 8, 4), 32 + 8 + 8 + 8);
    }
}
