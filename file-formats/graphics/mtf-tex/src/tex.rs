use bytes::Bytes;
use log::{debug, warn};
use mtf_data::DataError;
use mtf_data::schema::{Count, FieldDef, FieldKind, FieldValues, Primitive, RecordView, Schema};

use crate::dds::DdsImage;
use crate::error::{Result, TexError};
use crate::format::{PixelFormat, check_mip_count, tag_to_string};

pub const TEX_MAGIC: &[u8; 4] = b"TEX\0";
pub const TEX_VERSION: i16 = 112;
/// Revision written for single images
pub const REVISION_SINGLE: i16 = 34;
/// Revision written for cubemaps
pub const REVISION_CUBEMAP: i16 = 3;

/// Bytes before the optional cubemap block
pub const HEADER_SIZE: usize = 40;
const CUBEMAP_FLOATS: usize = 27;
const DEFAULT_COLOR: [f32; 4] = [0.87; 4];

fn cubemap_float_count(view: &RecordView<'_>) -> mtf_data::Result<i64> {
    Ok(if view.int("image_count")? > 1 {
        CUBEMAP_FLOATS as i64
    } else {
        0
    })
}

fn mip_offset_count(view: &RecordView<'_>) -> mtf_data::Result<i64> {
    Ok(view.int("mipmap_count")? * view.int("image_count")?)
}

static TEX112: Schema = Schema::new(
    "Tex112",
    &[
        FieldDef::bytes("magic", Count::Fixed(4)),
        FieldDef::scalar("version", Primitive::I16),
        FieldDef::scalar("revision", Primitive::I16),
        FieldDef::scalar("mipmap_count", Primitive::U8),
        FieldDef::scalar("image_count", Primitive::U8),
        FieldDef::scalar("unk_byte_1", Primitive::U8),
        FieldDef::scalar("unk_byte_2", Primitive::U8),
        FieldDef::scalar("width", Primitive::U16),
        FieldDef::scalar("height", Primitive::U16),
        FieldDef::scalar("reserved_1", Primitive::I32),
        FieldDef::bytes("compression", Count::Fixed(4)),
        FieldDef::array("color", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("cubemap_floats", Primitive::F32, Count::Computed(cubemap_float_count)),
        FieldDef::array("mipmap_offsets", Primitive::U32, Count::Computed(mip_offset_count)),
        FieldDef::new("data", FieldKind::Remaining),
    ],
);

/// A version 112 engine texture.
///
/// `mipmap_offsets` are absolute file offsets, one per face and level, face
/// major. `data` holds the payload of every face and level back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct Tex112 {
    pub version: i16,
    pub revision: i16,
    pub mipmap_count: u8,
    pub image_count: u8,
    pub unk_byte_1: u8,
    pub unk_byte_2: u8,
    pub width: u16,
    pub height: u16,
    pub reserved_1: i32,
    pub compression: [u8; 4],
    pub color: [f32; 4],
    /// Opaque block present on cubemaps only
    pub cubemap_floats: Vec<f32>,
    pub mipmap_offsets: Vec<u32>,
    pub data: Bytes,
}

impl Tex112 {
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() < 4 || &data[..4] != TEX_MAGIC {
            return Err(TexError::wrong_magic(&data[..data.len().min(4)], "TEX"));
        }
        let tex = TEX112.parse(data)?;
        let version = tex.i16("version")?;
        if version != TEX_VERSION {
            return Err(DataError::unsupported("TEX version", version).into());
        }

        let mipmap_count = tex.u8("mipmap_count")?;
        let width = tex.u16("width")?;
        let height = tex.u16("height")?;
        check_mip_count(
            "TEX header",
            width.into(),
            height.into(),
            mipmap_count.into(),
        )?;

        let mut compression = [0u8; 4];
        compression.copy_from_slice(&tex.bytes("compression")?);
        Ok(Self {
            version,
            revision: tex.i16("revision")?,
            mipmap_count,
            image_count: tex.u8("image_count")?,
            unk_byte_1: tex.u8("unk_byte_1")?,
            unk_byte_2: tex.u8("unk_byte_2")?,
            width,
            height,
            reserved_1: tex.i32("reserved_1")?,
            compression,
            color: tex.f32_array("color")?,
            cubemap_floats: tex.f32s("cubemap_floats")?,
            mipmap_offsets: tex.u32s("mipmap_offsets")?,
            data: tex.bytes("data")?,
        })
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        let values = FieldValues::new()
            .with("magic", *TEX_MAGIC)
            .with("version", self.version)
            .with("revision", self.revision)
            .with("mipmap_count", self.mipmap_count)
            .with("image_count", self.image_count)
            .with("unk_byte_1", self.unk_byte_1)
            .with("unk_byte_2", self.unk_byte_2)
            .with("width", self.width)
            .with("height", self.height)
            .with("reserved_1", self.reserved_1)
            .with("compression", self.compression)
            .with("color", self.color)
            .with("cubemap_floats", self.cubemap_floats.clone())
            .with("mipmap_offsets", self.mipmap_offsets.clone())
            .with("data", self.data.clone());
        Ok(TEX112.construct(values)?.as_bytes())
    }

    pub fn is_cubemap(&self) -> bool {
        self.image_count > 1
    }

    pub fn pixel_format(&self) -> Result<PixelFormat> {
        PixelFormat::from_tex_tag(self.compression).ok_or_else(|| {
            TexError::UnsupportedFormat(format!(
                "compression tag {}",
                tag_to_string(&self.compression)
            ))
        })
    }

    /// Offset of the payload from the start of the file.
    pub fn data_offset(&self) -> usize {
        data_offset(self.mipmap_count, self.image_count)
    }

    /// Wrap the payload in a DDS container. Payload bytes are copied through
    /// unchanged.
    pub fn to_dds(&self) -> Result<DdsImage> {
        let format = self.pixel_format()?;
        Ok(DdsImage {
            width: self.width.into(),
            height: self.height.into(),
            mipmap_count: self.mipmap_count.into(),
            format,
            cubemap: self.is_cubemap(),
            data: self.data.clone(),
        })
    }

    /// Build a texture from a DDS image, computing the mip offset table.
    pub fn from_dds(dds: &DdsImage) -> Result<Self> {
        if dds.mipmap_count == 0 {
            return Err(TexError::UnsupportedFormat(
                "source image declares no mip levels".into(),
            ));
        }
        check_mip_count("DDS image", dds.width, dds.height, dds.mipmap_count)?;
        let mipmap_count = u8::try_from(dds.mipmap_count).map_err(|_| {
            TexError::UnsupportedFormat(format!("{} mip levels", dds.mipmap_count))
        })?;
        let (width, height) = match (u16::try_from(dds.width), u16::try_from(dds.height)) {
            (Ok(width), Ok(height)) => (width, height),
            _ => {
                return Err(TexError::UnsupportedFormat(format!(
                    "{}x{} exceeds the texture size limit",
                    dds.width, dds.height
                )));
            }
        };
        let image_count = dds.image_count() as u8;
        let expected = dds.expected_payload_len();
        if dds.data.len() < expected {
            warn!(
                "DDS payload is {} bytes, mip table expects {}",
                dds.data.len(),
                expected
            );
        }

        let mipmap_offsets = mip_offsets(
            dds.format,
            dds.width,
            dds.height,
            mipmap_count,
            image_count,
        )?;
        debug!(
            "TEX {}x{} {} with {} levels x {} images, payload at {:#x}",
            width,
            height,
            dds.format,
            mipmap_count,
            image_count,
            data_offset(mipmap_count, image_count)
        );

        Ok(Self {
            version: TEX_VERSION,
            revision: if dds.cubemap {
                REVISION_CUBEMAP
            } else {
                REVISION_SINGLE
            },
            mipmap_count,
            image_count,
            unk_byte_1: 1,
            unk_byte_2: 0,
            width,
            height,
            reserved_1: 0,
            compression: dds.format.tex_tag(),
            color: DEFAULT_COLOR,
            cubemap_floats: if dds.cubemap {
                vec![0.0; CUBEMAP_FLOATS]
            } else {
                Vec::new()
            },
            mipmap_offsets,
            data: dds.data.clone(),
        })
    }
}

fn data_offset(mipmap_count: u8, image_count: u8) -> usize {
    let mut offset = HEADER_SIZE + mipmap_count as usize * image_count as usize * 4;
    if image_count > 1 {
        offset += CUBEMAP_FLOATS * 4;
    }
    offset
}

/// Absolute offsets of every face and level, starting right after the
/// header and accumulating level sizes face by face.
pub fn mip_offsets(
    format: PixelFormat,
    width: u32,
    height: u32,
    mipmap_count: u8,
    image_count: u8,
) -> Result<Vec<u32>> {
    check_mip_count("mip offset table", width, height, mipmap_count.into())?;
    let total = mipmap_count as usize * image_count as usize;
    let mut offsets = Vec::with_capacity(total);
    let mut current = data_offset(mipmap_count, image_count);
    for _ in 0..image_count {
        for level in 0..u32::from(mipmap_count) {
            offsets.push(u32::try_from(current).map_err(|_| {
                DataError::ValueOutOfRange {
                    value: current.to_string(),
                    target: "u32",
                }
            })?);
            current += format.level_size(width, height, level);
        }
    }
    Ok(offsets)
}

/// Convert a TEX file to a DDS file.
pub fn tex_to_dds(data: impl Into<Bytes>) -> Result<Bytes> {
    Tex112::parse(data)?.to_dds()?.to_bytes()
}

/// Convert a DDS file to a TEX file.
pub fn dds_to_tex(data: impl Into<Bytes>) -> Result<Bytes> {
    Tex112::from_dds(&DdsImage::parse(data)?)?.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn dds(format: PixelFormat, size: u32, mips: u32, cubemap: bool) -> DdsImage {
        let mut image = DdsImage {
            width: size,
            height: size,
            mipmap_count: mips,
            format,
            cubemap,
            data: Bytes::new(),
        };
        image.data = Bytes::from(
            (0..image.expected_payload_len())
                .map(|i| (i % 251) as u8)
                .collect::<Vec<_>>(),
        );
        image
    }

    #[test]
    fn test_single_block_dxt1() {
        let tex = Tex112::from_dds(&dds(PixelFormat::Dxt1, 4, 1, false)).unwrap();
        assert_eq!(tex.data.len(), 8);
        assert_eq!(tex.mipmap_offsets, vec![44]);
        assert_eq!(tex.revision, REVISION_SINGLE);
        assert_eq!(&tex.compression, b"DXT1");
    }

    #[test]
    fn test_mip_offsets_accumulate() {
        let offsets = mip_offsets(PixelFormat::Dxt5, 16, 16, 3, 1).unwrap();
        // header 40 + 3 offsets
        assert_eq!(offsets, vec![52, 52 + 256, 52 + 256 + 64]);
    }

    #[test]
    fn test_cubemap_offsets_restart_per_face() {
        let tex = Tex112::from_dds(&dds(PixelFormat::Dxt1, 8, 2, true)).unwrap();
        assert_eq!(tex.image_count, 6);
        assert_eq!(tex.revision, REVISION_CUBEMAP);
        assert_eq!(tex.cubemap_floats.len(), 27);
        let start = 40 + 12 * 4 + 108;
        assert_eq!(tex.data_offset(), start);
        assert_eq!(tex.mipmap_offsets.len(), 12);
        assert_eq!(tex.mipmap_offsets[0], start as u32);
        assert_eq!(tex.mipmap_offsets[1], start as u32 + 32);
        assert_eq!(tex.mipmap_offsets[2], start as u32 + 40);
        assert_eq!(*tex.mipmap_offsets.last().unwrap(), start as u32 + 5 * 40 + 32);
    }

    #[test]
    fn test_file_layout() {
        let tex = Tex112::from_dds(&dds(PixelFormat::Rgba8, 4, 3, false)).unwrap();
        let bytes = tex.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"TEX\0");
        assert_eq!(bytes.len(), tex.data_offset() + 64 + 16 + 4);
        assert_eq!(&bytes[20..24], &[0x15, 0, 0, 0]);
        assert_eq!(Tex112::parse(bytes).unwrap(), tex);
    }

    #[test]
    fn test_payload_passes_through() {
        for format in [PixelFormat::Rgba8, PixelFormat::Dxt1, PixelFormat::Dxt5] {
            let source = dds(format, 16, 4, false);
            let tex = Tex112::from_dds(&source).unwrap();
            let back = Tex112::parse(tex.to_bytes().unwrap()).unwrap().to_dds().unwrap();
            assert_eq!(back, source);
        }
    }

    #[test]
    fn test_missing_mips_rejected() {
        let err = Tex112::from_dds(&dds(PixelFormat::Dxt1, 4, 0, false)).unwrap_err();
        assert!(matches!(err, TexError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_unknown_compression_tag() {
        let mut tex = Tex112::from_dds(&dds(PixelFormat::Dxt1, 4, 1, false)).unwrap();
        tex.compression = *b"BC7U";
        let err = tex.to_dds().unwrap_err();
        assert!(matches!(err, TexError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_wrong_version() {
        let tex = Tex112::from_dds(&dds(PixelFormat::Dxt1, 4, 1, false)).unwrap();
        let mut bytes = tex.to_bytes().unwrap().to_vec();
        bytes[4..6].copy_from_slice(&157i16.to_le_bytes());
        let err = Tex112::parse(bytes).unwrap_err();
        assert!(matches!(
            err,
            TexError::Data(DataError::UnsupportedVariant { .. })
        ));
    }

    #[test]
    fn test_mip_count_past_the_chain() {
        let err = mip_offsets(PixelFormat::Dxt1, 4, 4, 40, 1).unwrap_err();
        assert!(matches!(err, TexError::Data(ref e) if e.is_malformed()));

        let mut source = dds(PixelFormat::Dxt1, 4, 1, false);
        source.mipmap_count = 33;
        let err = Tex112::from_dds(&source).unwrap_err();
        assert!(matches!(err, TexError::Data(ref e) if e.is_malformed()));
    }

    #[test]
    fn test_parse_rejects_impossible_mip_count() {
        let tex = Tex112::from_dds(&dds(PixelFormat::Dxt1, 4, 1, false)).unwrap();
        let mut bytes = tex.to_bytes().unwrap().to_vec();
        // 4x4 holds three levels at most
        bytes[8] = 4;
        bytes.extend_from_slice(&[0; 12]);
        let err = Tex112::parse(bytes).unwrap_err();
        assert!(matches!(err, TexError::Data(ref e) if e.is_malformed()));
    }

    #[test]
    fn test_truncated_offset_table() {
        let tex = Tex112::from_dds(&dds(PixelFormat::Dxt1, 16, 3, false)).unwrap();
        let bytes = tex.to_bytes().unwrap();
        let err = Tex112::parse(bytes.slice(..HEADER_SIZE + 4)).unwrap_err();
        assert!(matches!(err, TexError::Data(ref e) if e.is_malformed()));
    }
}
