//! DirectDraw Surface container.
//!
//! Only the parts a texture conversion needs are modelled: dimensions, mip
//! count, pixel format and the cubemap flag. The DX10 extension header is
//! not supported.

use bitflags::bitflags;
use bytes::Bytes;
use log::{debug, warn};
use mtf_data::schema::{Count, FieldDef, FieldKind, FieldValues, Primitive, Schema};

use crate::error::{Result, TexError};
use crate::format::{PixelFormat, check_mip_count, tag_to_string};

pub const DDS_MAGIC: &[u8; 4] = b"DDS ";
pub const DDS_HEADER_SIZE: u32 = 124;
const PIXEL_FORMAT_SIZE: u32 = 32;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u32 {
        const CAPS = 0x1;
        const HEIGHT = 0x2;
        const WIDTH = 0x4;
        const PITCH = 0x8;
        const PIXELFORMAT = 0x1000;
        const MIPMAPCOUNT = 0x2_0000;
        const LINEARSIZE = 0x8_0000;
        const DEPTH = 0x80_0000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PixelFormatFlags: u32 {
        const ALPHAPIXELS = 0x1;
        const FOURCC = 0x4;
        const RGB = 0x40;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Caps: u32 {
        const COMPLEX = 0x8;
        const TEXTURE = 0x1000;
        const MIPMAP = 0x40_0000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Caps2: u32 {
        const CUBEMAP = 0x200;
        const POSITIVE_X = 0x400;
        const NEGATIVE_X = 0x800;
        const POSITIVE_Y = 0x1000;
        const NEGATIVE_Y = 0x2000;
        const POSITIVE_Z = 0x4000;
        const NEGATIVE_Z = 0x8000;
        const ALL_FACES = Self::CUBEMAP.bits()
            | Self::POSITIVE_X.bits()
            | Self::NEGATIVE_X.bits()
            | Self::POSITIVE_Y.bits()
            | Self::NEGATIVE_Y.bits()
            | Self::POSITIVE_Z.bits()
            | Self::NEGATIVE_Z.bits();
    }
}

const RGBA_MASKS: [u32; 4] = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000];

static DDS_FILE: Schema = Schema::new(
    "DdsFile",
    &[
        FieldDef::bytes("magic", Count::Fixed(4)),
        FieldDef::scalar("size", Primitive::U32),
        FieldDef::scalar("flags", Primitive::U32),
        FieldDef::scalar("height", Primitive::U32),
        FieldDef::scalar("width", Primitive::U32),
        FieldDef::scalar("pitch_or_linear_size", Primitive::U32),
        FieldDef::scalar("depth", Primitive::U32),
        FieldDef::scalar("mipmap_count", Primitive::U32),
        FieldDef::array("reserved_1", Primitive::U32, Count::Fixed(11)),
        FieldDef::scalar("pf_size", Primitive::U32),
        FieldDef::scalar("pf_flags", Primitive::U32),
        FieldDef::bytes("pf_four_cc", Count::Fixed(4)),
        FieldDef::scalar("pf_rgb_bit_count", Primitive::U32),
        FieldDef::array("pf_masks", Primitive::U32, Count::Fixed(4)),
        FieldDef::scalar("caps", Primitive::U32),
        FieldDef::scalar("caps2", Primitive::U32),
        FieldDef::scalar("caps3", Primitive::U32),
        FieldDef::scalar("caps4", Primitive::U32),
        FieldDef::scalar("reserved_2", Primitive::U32),
        FieldDef::new("data", FieldKind::Remaining),
    ],
);

/// A DDS image: header essentials plus the raw payload of every face and mip.
#[derive(Debug, Clone, PartialEq)]
pub struct DdsImage {
    pub width: u32,
    pub height: u32,
    /// Levels per face as declared in the header. 0 means the file has no
    /// mip count.
    pub mipmap_count: u32,
    pub format: PixelFormat,
    /// Set when all six cube faces are declared
    pub cubemap: bool,
    pub data: Bytes,
}

impl DdsImage {
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() < 4 || &data[..4] != DDS_MAGIC {
            return Err(TexError::wrong_magic(&data[..data.len().min(4)], "DDS "));
        }
        let file = DDS_FILE.parse(data)?;

        let size = file.u32("size")?;
        if size != DDS_HEADER_SIZE {
            warn!("DDS header declares size {size}, expected {DDS_HEADER_SIZE}");
        }
        let flags = HeaderFlags::from_bits_retain(file.u32("flags")?);
        let pf_flags = PixelFormatFlags::from_bits_retain(file.u32("pf_flags")?);
        let caps2 = Caps2::from_bits_retain(file.u32("caps2")?);

        let format = if pf_flags.contains(PixelFormatFlags::FOURCC) {
            let mut four_cc = [0u8; 4];
            four_cc.copy_from_slice(&file.bytes("pf_four_cc")?);
            PixelFormat::from_four_cc(four_cc).ok_or_else(|| {
                TexError::UnsupportedFormat(format!("DDS FourCC {}", tag_to_string(&four_cc)))
            })?
        } else {
            let bit_count = file.u32("pf_rgb_bit_count")?;
            if !pf_flags.contains(PixelFormatFlags::RGB) || bit_count != 32 {
                return Err(TexError::UnsupportedFormat(format!(
                    "uncompressed DDS with {bit_count} bits per pixel"
                )));
            }
            PixelFormat::Rgba8
        };

        let mipmap_count = file.u32("mipmap_count")?;
        if !flags.contains(HeaderFlags::MIPMAPCOUNT) && mipmap_count != 0 {
            debug!("DDS mip count {mipmap_count} present without the MIPMAPCOUNT flag");
        }

        let width = file.u32("width")?;
        let height = file.u32("height")?;
        check_mip_count("DDS header", width, height, mipmap_count)?;

        let image = Self {
            width,
            height,
            mipmap_count,
            format,
            cubemap: caps2.contains(Caps2::ALL_FACES),
            data: file.bytes("data")?,
        };
        let expected = image.expected_payload_len();
        if image.data.len() != expected {
            warn!(
                "DDS payload is {} bytes, {} expected for {}x{} {} with {} levels",
                image.data.len(),
                expected,
                image.width,
                image.height,
                image.format,
                image.mipmap_count
            );
        }
        Ok(image)
    }

    pub fn image_count(&self) -> u32 {
        if self.cubemap { 6 } else { 1 }
    }

    /// Payload size implied by the header.
    pub fn expected_payload_len(&self) -> usize {
        self.format
            .chain_size(self.width, self.height, self.mipmap_count)
            * self.image_count() as usize
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut flags = HeaderFlags::CAPS
            | HeaderFlags::HEIGHT
            | HeaderFlags::WIDTH
            | HeaderFlags::PIXELFORMAT
            | HeaderFlags::MIPMAPCOUNT;
        let mut caps = Caps::TEXTURE;
        if self.mipmap_count > 1 {
            caps |= Caps::MIPMAP | Caps::COMPLEX;
        }
        if self.cubemap {
            caps |= Caps::COMPLEX;
        }
        let caps2 = if self.cubemap { Caps2::ALL_FACES } else { Caps2::empty() };

        let mut values = FieldValues::new();
        let pitch = match self.format.four_cc() {
            Some(four_cc) => {
                flags |= HeaderFlags::LINEARSIZE;
                values
                    .set("pf_flags", PixelFormatFlags::FOURCC.bits())
                    .set("pf_four_cc", four_cc);
                self.format.level_size(self.width, self.height, 0)
            }
            None => {
                flags |= HeaderFlags::PITCH;
                values
                    .set("pf_flags", (PixelFormatFlags::RGB | PixelFormatFlags::ALPHAPIXELS).bits())
                    .set("pf_rgb_bit_count", 32u32)
                    .set("pf_masks", RGBA_MASKS);
                self.width as usize * 4
            }
        };

        values
            .set("magic", *DDS_MAGIC)
            .set("size", DDS_HEADER_SIZE)
            .set("flags", flags.bits())
            .set("height", self.height)
            .set("width", self.width)
            .set("pitch_or_linear_size", pitch as u32)
            .set("mipmap_count", self.mipmap_count)
            .set("pf_size", PIXEL_FORMAT_SIZE)
            .set("caps", caps.bits())
            .set("caps2", caps2.bits())
            .set("data", self.data.clone());
        Ok(DDS_FILE.construct(values)?.as_bytes())
    }
}
