//! File level conversions between TEX and DDS

use bytes::Bytes;
use mtf_tex::{DdsImage, PixelFormat, Tex112, TexError, dds_to_tex, tex_to_dds};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn payload(len: usize) -> Bytes {
    (0..len).map(|i| (i * 7 % 256) as u8).collect::<Vec<_>>().into()
}

fn source_dds(format: PixelFormat, width: u32, height: u32, mips: u32, cubemap: bool) -> DdsImage {
    let mut image = DdsImage {
        width,
        height,
        mipmap_count: mips,
        format,
        cubemap,
        data: Bytes::new(),
    };
    image.data = payload(image.expected_payload_len());
    image
}

#[test_case(PixelFormat::Rgba8, 32, 16, 6, false ; "uncompressed")]
#[test_case(PixelFormat::Dxt1, 64, 64, 7, false ; "dxt1")]
#[test_case(PixelFormat::Dxt3, 16, 32, 5, false ; "dxt3")]
#[test_case(PixelFormat::Dxt5, 128, 64, 8, false ; "dxt5")]
#[test_case(PixelFormat::Ati2, 8, 8, 1, false ; "ati2 single level")]
#[test_case(PixelFormat::Dxt1, 16, 16, 5, true ; "dxt1 cubemap")]
fn test_dds_file_survives_tex(format: PixelFormat, width: u32, height: u32, mips: u32, cubemap: bool) {
    let dds_bytes = source_dds(format, width, height, mips, cubemap).to_bytes().unwrap();
    let tex_bytes = dds_to_tex(dds_bytes.clone()).unwrap();
    assert_eq!(&tex_bytes[..4], b"TEX\0");
    assert_eq!(tex_to_dds(tex_bytes).unwrap(), dds_bytes);
}

#[test]
fn test_payload_is_tail_of_both_files() {
    let dds = source_dds(PixelFormat::Dxt5, 32, 32, 6, false);
    let tex_bytes = dds_to_tex(dds.to_bytes().unwrap()).unwrap();
    let tex = Tex112::parse(tex_bytes.clone()).unwrap();
    assert_eq!(tex.data, dds.data);
    assert_eq!(&tex_bytes[tex.data_offset()..], &dds.data[..]);

    // Every offset points inside the payload and levels shrink
    let offsets = &tex.mipmap_offsets;
    assert_eq!(offsets[0] as usize, tex.data_offset());
    assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
    assert!((*offsets.last().unwrap() as usize) < tex_bytes.len());
}

#[test]
fn test_tex_to_dds_rejects_garbage() {
    assert!(matches!(
        tex_to_dds(Bytes::from_static(b"MOD\0\x9c\0")),
        Err(TexError::WrongMagic { .. })
    ));
    assert!(matches!(
        dds_to_tex(Bytes::from_static(b"TEX\0")),
        Err(TexError::WrongMagic { .. })
    ));
}
