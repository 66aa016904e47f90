use std::collections::{BTreeMap, HashMap};

use mtf_data::prelude::*;

use crate::error::{ModError, Result};

/// Size of a texture path entry
pub const TEXTURE_PATH_SIZE: usize = 64;

pub const MATERIAL_PARAM_COUNT: usize = 26;

/// Indices into [`Material::params`] with a known meaning
pub const PARAM_CUBEMAP_ROUGHNESS: usize = 5;
pub const PARAM_DETAIL_POWER: usize = 10;
pub const PARAM_DETAIL_FACTOR: usize = 11;
pub const PARAM_NORMALMAP_GREEN_CHANNEL: usize = 20;

bitflags::bitflags! {
    /// First material flag word, blending and geometry behaviour
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct BlendFlags: u16 {
        const UNK_01 = 1 << 0;
        const UNK_02 = 1 << 1;
        const BRIDGE_GEOMETRY = 1 << 2;
        const ALPHA_CLIP = 1 << 5;
        /// Opaque
        const NO_ALPHA = 1 << 6;
        const TRANSLUCENT = 1 << 7;
        const ALPHA_TRANSPARENCY = 1 << 8;
    }
}

bitflags::bitflags! {
    /// Second material flag word
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct MaterialFlags: u16 {
        const UNK_02 = 1 << 1;
        const UNK_07 = 1 << 6;
        const UNK_09 = 1 << 8;
        /// Skinned meshes use eight influences; static meshes carry vertex
        /// colours in their third UV channel
        const EIGHT_BONES_VERTEX = 1 << 11;
        const UNK_15 = 1 << 14;
    }
}

bitflags::bitflags! {
    /// Third material flag word, shader feature switches
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ShaderFlags: u16 {
        const UNK_01 = 1 << 0;
        const UNK_02 = 1 << 1;
        const DO_NOT_USE_AM_AS_EMISSIVE = 1 << 7;
        const USE_AM_AS_EMISSIVE = 1 << 8;
        const DO_NOT_USE_DETAIL_MAP = 1 << 10;
        const USE_DETAIL_MAP = 1 << 11;
        const ENV_CUBEMAP = 1 << 14;
    }
}

/// Role of each of the eight texture slots of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSlot {
    Diffuse = 0,
    Normal = 1,
    Specular = 2,
    Lightmap = 3,
    EmissiveMask = 4,
    AlphaMask = 5,
    EnvCubemap = 6,
    DetailNormal = 7,
}

impl TextureSlot {
    pub const ALL: [Self; 8] = [
        Self::Diffuse,
        Self::Normal,
        Self::Specular,
        Self::Lightmap,
        Self::EmissiveMask,
        Self::AlphaMask,
        Self::EnvCubemap,
        Self::DetailNormal,
    ];

    /// Texture name suffix used by the engine's asset naming
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Diffuse => "BM",
            Self::Normal => "NM",
            Self::Specular => "MM",
            Self::Lightmap => "LM",
            Self::EmissiveMask => "EM",
            Self::AlphaMask => "AM",
            Self::EnvCubemap => "CM",
            Self::DetailNormal => "DNM",
        }
    }
}

pub(crate) static MATERIAL: Schema = Schema::new(
    "Mod156Material",
    &[
        FieldDef::scalar("blend_flags", Primitive::U16),
        FieldDef::scalar("material_flags", Primitive::U16),
        FieldDef::scalar("shader_flags", Primitive::U16),
        FieldDef::scalar("unk_03", Primitive::I16),
        FieldDef::array("unknowns", Primitive::U16, Count::Fixed(8)),
        FieldDef::array("texture_indices", Primitive::U32, Count::Fixed(8)),
        FieldDef::array("params", Primitive::F32, Count::Fixed(MATERIAL_PARAM_COUNT)),
    ],
);

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub blend: BlendFlags,
    pub flags: MaterialFlags,
    pub shader: ShaderFlags,
    pub unk_03: i16,
    pub unknowns: [u16; 8],
    /// One-based indices into the texture table, 0 for an empty slot
    pub texture_indices: [u32; 8],
    pub params: [f32; MATERIAL_PARAM_COUNT],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            blend: BlendFlags::UNK_01 | BlendFlags::UNK_02 | BlendFlags::NO_ALPHA,
            flags: MaterialFlags::UNK_02
                | MaterialFlags::UNK_07
                | MaterialFlags::UNK_09
                | MaterialFlags::UNK_15,
            shader: ShaderFlags::UNK_01
                | ShaderFlags::UNK_02
                | ShaderFlags::DO_NOT_USE_AM_AS_EMISSIVE
                | ShaderFlags::DO_NOT_USE_DETAIL_MAP
                | ShaderFlags::ENV_CUBEMAP,
            unk_03: 0,
            unknowns: [58886, 34599, 451, 0, 2160, 2737, 0, 0],
            texture_indices: [0; 8],
            params: [
                0.0,
                1.0,
                0.035,
                0.0,
                1.0,
                0.3,
                1.0,
                1.0,
                1.0,
                0.0,
                0.25,
                10.0,
                0.0,
                0.5,
                0.0,
                0.0,
                0.0,
                0.0,
                0.0,
                0.0,
                1.0,
                0.2,
                2.380_728_7e-37,
                1.121_038_8e-44,
                0.0,
                0.0,
            ],
        }
    }
}

impl Material {
    /// Zero-based texture table index of a slot.
    pub fn texture(&self, slot: TextureSlot) -> Option<usize> {
        match self.texture_indices[slot as usize] {
            0 => None,
            index => Some(index as usize - 1),
        }
    }

    /// Point a slot at a zero-based texture table index.
    pub fn set_texture(&mut self, slot: TextureSlot, texture: Option<usize>) {
        self.texture_indices[slot as usize] = texture.map_or(0, |index| index as u32 + 1);
    }

    pub fn cubemap_roughness(&self) -> f32 {
        self.params[PARAM_CUBEMAP_ROUGHNESS]
    }

    pub fn detail_factor(&self) -> f32 {
        self.params[PARAM_DETAIL_FACTOR]
    }

    pub fn normalmap_green_channel(&self) -> f32 {
        self.params[PARAM_NORMALMAP_GREEN_CHANNEL]
    }
}

impl SchemaRecord for Material {
    fn schema() -> &'static Schema {
        &MATERIAL
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        let mut unknowns = [0u16; 8];
        unknowns.copy_from_slice(&structure.u16s("unknowns")?);
        let mut texture_indices = [0u32; 8];
        texture_indices.copy_from_slice(&structure.u32s("texture_indices")?);
        Ok(Self {
            blend: BlendFlags::from_bits_retain(structure.u16("blend_flags")?),
            flags: MaterialFlags::from_bits_retain(structure.u16("material_flags")?),
            shader: ShaderFlags::from_bits_retain(structure.u16("shader_flags")?),
            unk_03: structure.i16("unk_03")?,
            unknowns,
            texture_indices,
            params: structure.f32_array("params")?,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("blend_flags", self.blend.bits())
            .with("material_flags", self.flags.bits())
            .with("shader_flags", self.shader.bits())
            .with("unk_03", self.unk_03)
            .with("unknowns", self.unknowns)
            .with("texture_indices", self.texture_indices)
            .with("params", self.params)
    }
}

/// Decode a NUL padded texture path entry.
pub fn decode_texture_path(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Validate a texture path and drop its extension.
///
/// The full path, extension included, must be ASCII and fit the 64 byte
/// field.
pub fn encode_texture_path(path: &str) -> Result<Vec<u8>> {
    validate_texture_path(path)?;
    Ok(strip_extension(path).as_bytes().to_vec())
}

/// Check that a path fits the fixed ASCII path field.
pub fn validate_texture_path(path: &str) -> Result<()> {
    if !path.is_ascii() {
        return Err(ModError::PathEncoding {
            path: path.to_owned(),
            reason: "is not ASCII",
        });
    }
    if path.len() > TEXTURE_PATH_SIZE {
        return Err(ModError::PathEncoding {
            path: path.to_owned(),
            reason: "is longer than 64 bytes",
        });
    }
    Ok(())
}

fn split_dir(path: &str) -> (&str, &str) {
    match path.rfind(['\\', '/']) {
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

fn strip_extension(path: &str) -> &str {
    let (dir, name) = split_dir(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &path[..dir.len() + usize::from(!dir.is_empty()) + dot],
        _ => path,
    }
}

/// Directory of every texture, keyed by file name.
pub fn texture_dirs(paths: &[String]) -> BTreeMap<String, String> {
    paths
        .iter()
        .map(|path| {
            let (dir, name) = split_dir(path);
            (name.to_owned(), dir.to_owned())
        })
        .collect()
}

/// Most common texture directory, the first one seen on ties.
pub fn default_texture_dir(paths: &[String]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, path) in paths.iter().enumerate() {
        let (dir, _) = split_dir(path);
        counts.entry(dir).or_insert((0, order)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, order_a)), (_, (count_b, order_b))| {
            count_a.cmp(count_b).then(order_b.cmp(order_a))
        })
        .map(|(dir, _)| dir.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_material_record_size() {
        assert_eq!(MATERIAL.fixed_size(), Some(160));
    }

    #[test]
    fn test_default_material_round_trip() {
        let material = Material::default();
        assert_eq!(material.blend.bits(), 0x0043);
        assert_eq!(material.flags.bits(), 0x4142);
        assert_eq!(material.shader.bits(), 0x4483);
        assert_eq!(material.detail_factor(), 10.0);
        assert_eq!(material.normalmap_green_channel(), 1.0);

        let bytes = material.to_structure().unwrap().as_bytes();
        assert_eq!(Material::parse(bytes).unwrap(), material);
    }

    #[test]
    fn test_texture_slots_are_one_based() {
        let mut material = Material::default();
        assert_eq!(material.texture(TextureSlot::Normal), None);
        material.set_texture(TextureSlot::Normal, Some(0));
        assert_eq!(material.texture_indices[1], 1);
        assert_eq!(material.texture(TextureSlot::Normal), Some(0));
        material.set_texture(TextureSlot::Normal, None);
        assert_eq!(material.texture_indices[1], 0);
    }

    #[test]
    fn test_unknown_flag_bits_survive() {
        let mut material = Material::default();
        material.flags = MaterialFlags::from_bits_retain(0xFFFF);
        let bytes = material.to_structure().unwrap().as_bytes();
        assert_eq!(Material::parse(bytes).unwrap().flags.bits(), 0xFFFF);
    }

    #[test_case("pawn\\pl\\pl0200_BM.dds", "pawn\\pl\\pl0200_BM" ; "windows path")]
    #[test_case("pl0200_NM.tga", "pl0200_NM" ; "bare name")]
    #[test_case("pawn\\pl.v2\\pl0200", "pawn\\pl.v2\\pl0200" ; "dot in directory")]
    fn test_encode_texture_path(path: &str, stored: &str) {
        assert_eq!(encode_texture_path(path).unwrap(), stored.as_bytes());
    }

    #[test]
    fn test_encode_rejects_long_or_non_ascii_paths() {
        let long = format!("{}.dds", "a".repeat(61));
        assert!(matches!(
            encode_texture_path(&long),
            Err(ModError::PathEncoding { .. })
        ));
        assert!(encode_texture_path(&"a".repeat(64)).is_ok());
        assert!(matches!(
            encode_texture_path("textures\\pl0200_BM_ü"),
            Err(ModError::PathEncoding { .. })
        ));
    }

    #[test]
    fn test_texture_dirs() {
        let paths = vec![
            "pawn\\pl\\pl0200_BM".to_owned(),
            "pawn\\pl\\pl0200_NM".to_owned(),
            "common\\white".to_owned(),
        ];
        let dirs = texture_dirs(&paths);
        assert_eq!(dirs["pl0200_NM"], "pawn\\pl");
        assert_eq!(dirs["white"], "common");
        assert_eq!(default_texture_dir(&paths).as_deref(), Some("pawn\\pl"));
        assert_eq!(default_texture_dir(&[]), None);
    }

    #[test]
    fn test_decode_texture_path() {
        let mut raw = [0u8; 64];
        raw[..6].copy_from_slice(b"a\\b_BM");
        assert_eq!(decode_texture_path(&raw), "a\\b_BM");
    }
}
