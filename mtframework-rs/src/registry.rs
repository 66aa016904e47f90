//! Format detection by leading magic.
//!
//! A [`FormatRegistry`] maps the first four bytes of a file to the handler
//! that knows how to summarise or convert it. The binary builds one at
//! startup and hands it to the commands that dispatch on content.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use bytes::Bytes;

use mtf_arc::Archive;
use mtf_lmt::Lmt;
use mtf_mod::Mod156;
use mtf_sbc::Sbc1;
use mtf_tex::{DdsImage, Tex112};

use crate::utils::{format_bytes, format_vec3};

/// Ordered `(property, value)` rows describing a file
pub type Properties = Vec<(String, String)>;

/// Summarise and convert one file format
pub trait FormatHandler {
    /// Short format name shown to users
    fn name(&self) -> &'static str;

    fn describe(&self, data: Bytes) -> Result<Properties>;

    /// Extension of the converted file, when the format converts at all
    fn converts_to(&self) -> Option<&'static str> {
        None
    }

    fn convert(&self, _data: Bytes) -> Result<Bytes> {
        bail!("{} files have no conversion", self.name())
    }
}

/// Table of handlers keyed by file magic
#[derive(Default)]
pub struct FormatRegistry {
    handlers: BTreeMap<[u8; 4], Box<dyn FormatHandler>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every format this workspace reads.
    pub fn with_builtin_formats() -> Self {
        let mut registry = Self::new();
        registry.register(*mtf_arc::archive::ARC_MAGIC, ArcHandler);
        registry.register(*mtf_tex::tex::TEX_MAGIC, TexHandler);
        registry.register(*mtf_tex::dds::DDS_MAGIC, DdsHandler);
        registry.register(*mtf_mod::MOD_MAGIC, ModHandler);
        registry.register(*mtf_lmt::lmt::LMT_MAGIC, LmtHandler);
        registry.register(*mtf_sbc::SBC_MAGIC, SbcHandler);
        registry
    }

    /// Add a handler, returning the one it replaces.
    pub fn register(
        &mut self,
        magic: [u8; 4],
        handler: impl FormatHandler + 'static,
    ) -> Option<Box<dyn FormatHandler>> {
        self.handlers.insert(magic, Box::new(handler))
    }

    /// Handler for the magic at the start of `data`.
    pub fn detect(&self, data: &[u8]) -> Option<&dyn FormatHandler> {
        let magic: [u8; 4] = data.get(..4)?.try_into().ok()?;
        self.handlers.get(&magic).map(Box::as_ref)
    }

    pub fn formats(&self) -> impl Iterator<Item = ([u8; 4], &dyn FormatHandler)> {
        self.handlers
            .iter()
            .map(|(magic, handler)| (*magic, handler.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn row(key: &str, value: impl ToString) -> (String, String) {
    (key.to_owned(), value.to_string())
}

struct ArcHandler;

impl FormatHandler for ArcHandler {
    fn name(&self) -> &'static str {
        "ARC archive"
    }

    fn describe(&self, data: Bytes) -> Result<Properties> {
        let archive = Archive::parse(data)?;
        let size: u64 = archive.entries().iter().map(|e| u64::from(e.size)).sum();
        let packed: u64 = archive
            .entries()
            .iter()
            .map(|e| u64::from(e.compressed_size))
            .sum();
        Ok(vec![
            row("Version", archive.version()),
            row("Members", archive.len()),
            row("Total size", format_bytes(size)),
            row("Compressed size", format_bytes(packed)),
        ])
    }
}

struct TexHandler;

impl FormatHandler for TexHandler {
    fn name(&self) -> &'static str {
        "TEX texture"
    }

    fn describe(&self, data: Bytes) -> Result<Properties> {
        let tex = Tex112::parse(data)?;
        Ok(vec![
            row("Version", tex.version),
            row("Revision", tex.revision),
            row("Dimensions", format!("{}x{}", tex.width, tex.height)),
            row("Mipmaps", tex.mipmap_count),
            row("Images", tex.image_count),
            row("Cubemap", tex.is_cubemap()),
            row("Compression", mtf_tex::format::tag_to_string(&tex.compression)),
            row("Payload", format_bytes(tex.data.len() as u64)),
        ])
    }

    fn converts_to(&self) -> Option<&'static str> {
        Some("dds")
    }

    fn convert(&self, data: Bytes) -> Result<Bytes> {
        Ok(mtf_tex::tex_to_dds(data)?)
    }
}

struct DdsHandler;

impl FormatHandler for DdsHandler {
    fn name(&self) -> &'static str {
        "DDS image"
    }

    fn describe(&self, data: Bytes) -> Result<Properties> {
        let dds = DdsImage::parse(data)?;
        Ok(vec![
            row("Dimensions", format!("{}x{}", dds.width, dds.height)),
            row("Mipmaps", dds.mipmap_count),
            row("Format", format!("{:?}", dds.format)),
            row("Cubemap", dds.cubemap),
            row("Payload", format_bytes(dds.data.len() as u64)),
        ])
    }

    fn converts_to(&self) -> Option<&'static str> {
        Some("tex")
    }

    fn convert(&self, data: Bytes) -> Result<Bytes> {
        Ok(mtf_tex::dds_to_tex(data)?)
    }
}

struct ModHandler;

impl FormatHandler for ModHandler {
    fn name(&self) -> &'static str {
        "MOD model"
    }

    fn describe(&self, data: Bytes) -> Result<Properties> {
        let model = Mod156::parse(data)?;
        let bbox = model.bounding_box();
        Ok(vec![
            row("Version", mtf_mod::MOD_VERSION),
            row("Bones", model.bones.len()),
            row("Bone palettes", model.bone_palettes.len()),
            row("Meshes", model.meshes.len()),
            row("Materials", model.materials.len()),
            row("Textures", model.textures.len()),
            row("Vertices", model.vertex_count),
            row("Strip indices", model.index_buffer.len()),
            row("Box min", format_vec3(bbox.min.to_array())),
            row("Box max", format_vec3(bbox.max.to_array())),
        ])
    }
}

struct LmtHandler;

impl FormatHandler for LmtHandler {
    fn name(&self) -> &'static str {
        "LMT animation set"
    }

    fn describe(&self, data: Bytes) -> Result<Properties> {
        let lmt = Lmt::parse(data)?;
        let longest = lmt
            .blocks
            .iter()
            .map(|(_, block)| block.frame_count)
            .max()
            .unwrap_or(0);
        Ok(vec![
            row("Version", lmt.version),
            row("Slots", lmt.block_offsets.len()),
            row("Animations", lmt.blocks.len()),
            row("Longest animation", format!("{longest} frames")),
        ])
    }
}

struct SbcHandler;

impl FormatHandler for SbcHandler {
    fn name(&self) -> &'static str {
        "SBC1 collision"
    }

    fn describe(&self, data: Bytes) -> Result<Properties> {
        let sbc = Sbc1::parse(data)?;
        Ok(vec![
            row("Boxes", sbc.boxes.len()),
            row("Groups", sbc.groups.len()),
            row("Triangles", sbc.triangles.len()),
            row("Vertices", sbc.vertices.len()),
            row("Box min", format_vec3(sbc.bbox.min.to_array())),
            row("Box max", format_vec3(sbc.bbox.max.to_array())),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixed;

    impl FormatHandler for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn describe(&self, data: Bytes) -> Result<Properties> {
            Ok(vec![row("Size", data.len())])
        }
    }

    #[test]
    fn test_builtin_formats() {
        let registry = FormatRegistry::with_builtin_formats();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.detect(b"TEX\0rest").map(|h| h.name()), Some("TEX texture"));
        assert_eq!(registry.detect(b"SBC1").map(|h| h.name()), Some("SBC1 collision"));
        assert!(registry.detect(b"PNG\0").is_none());
        assert!(registry.detect(b"MO").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = FormatRegistry::new();
        assert!(registry.register(*b"ABCD", Fixed).is_none());
        assert!(registry.register(*b"ABCD", Fixed).is_some());
        let handler = registry.detect(b"ABCDxyz").unwrap();
        assert_eq!(
            handler.describe(Bytes::from_static(b"ABCDxyz")).unwrap(),
            vec![("Size".to_owned(), "7".to_owned())]
        );
        assert_eq!(handler.converts_to(), None);
        assert!(handler.convert(Bytes::new()).is_err());
    }
}
