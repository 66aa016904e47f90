use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use glam::{Mat4, Vec3, Vec4};
use log::{debug, error, trace, warn};
use mtf_data::prelude::*;
use mtf_data::types::magic_to_string;

use crate::bone::{ANIMATION_MAPPING_SIZE, BONE, BONE_PALETTE, Bone, BonePalette};
use crate::bounds::{WEIGHT_BOUND, WeightBound};
use crate::error::{ModError, Result};
use crate::material::{
    MATERIAL, Material, TEXTURE_PATH_SIZE, decode_texture_path, default_texture_dir, texture_dirs,
    validate_texture_path,
};
use crate::mesh::{MESH, Mesh};
use crate::strip::strip_to_triangles;
use crate::vertex::{VertexLayout, decode_vertex, layout_for};

pub const MOD_MAGIC: &[u8; 4] = b"MOD\0";
pub const MOD_VERSION: u8 = 156;
pub const HEADER_SIZE: usize = 176;

const UNKNOWN_FIELDS: [&str; 11] = [
    "unk_01", "unk_02", "unk_03", "unk_04", "unk_05", "unk_06", "unk_07", "unk_08", "unk_09",
    "unk_10", "unk_11",
];

fn bone_matrix_floats(view: &RecordView<'_>) -> mtf_data::Result<i64> {
    Ok(view.int("bone_count")? * 16)
}

fn animation_mapping_len(view: &RecordView<'_>) -> mtf_data::Result<i64> {
    Ok(if view.int("bone_palette_count")? > 0 {
        ANIMATION_MAPPING_SIZE as i64
    } else {
        0
    })
}

fn texture_table_len(view: &RecordView<'_>) -> mtf_data::Result<i64> {
    Ok(view.int("texture_count")? * TEXTURE_PATH_SIZE as i64)
}

fn index_count(view: &RecordView<'_>) -> mtf_data::Result<i64> {
    Ok(view.int("face_count")? - 1)
}

// Opaque blocks between the header and the bones, sized by header words
fn block_01_len(view: &RecordView<'_>) -> mtf_data::Result<i64> {
    Ok(view.int("unk_10")? * 4)
}

fn block_02_len(view: &RecordView<'_>) -> mtf_data::Result<i64> {
    Ok(view.int("unk_09")? * 16)
}

fn block_03_len(view: &RecordView<'_>) -> mtf_data::Result<i64> {
    Ok(view.int("unk_08")? * 8)
}

const UNK_BLOCK_SIZES: [usize; 3] = [4, 16, 8];

pub(crate) static GROUP: Schema = Schema::new(
    "Mod156Group",
    &[
        FieldDef::scalar("group_index", Primitive::U32),
        FieldDef::array("params", Primitive::F32, Count::Fixed(7)),
    ],
);

pub(crate) static MOD156: Schema = Schema::new(
    "Mod156",
    &[
        FieldDef::bytes("magic", Count::Fixed(4)),
        FieldDef::scalar("version", Primitive::U8),
        FieldDef::scalar("version_rev", Primitive::I8),
        FieldDef::scalar("bone_count", Primitive::U16),
        FieldDef::scalar("mesh_count", Primitive::I16),
        FieldDef::scalar("material_count", Primitive::U16),
        FieldDef::scalar("vertex_count", Primitive::U32),
        FieldDef::scalar("face_count", Primitive::U32),
        FieldDef::scalar("edge_count", Primitive::U32),
        FieldDef::scalar("vertex_buffer_size", Primitive::U32),
        FieldDef::scalar("vertex_buffer_2_size", Primitive::U32),
        FieldDef::scalar("texture_count", Primitive::U32),
        FieldDef::scalar("group_count", Primitive::U32),
        FieldDef::scalar("bone_palette_count", Primitive::U32),
        FieldDef::offset_of_non_empty("bones_offset", Primitive::U32, "bones"),
        FieldDef::offset_of("groups_offset", Primitive::U32, "groups"),
        FieldDef::offset_of("textures_offset", Primitive::U32, "textures"),
        FieldDef::offset_of("meshes_offset", Primitive::U32, "meshes"),
        FieldDef::offset_of("vertex_buffer_offset", Primitive::U32, "vertex_buffer"),
        FieldDef::offset_of("vertex_buffer_2_offset", Primitive::U32, "vertex_buffer_2"),
        FieldDef::offset_of("index_buffer_offset", Primitive::U32, "index_buffer"),
        FieldDef::scalar("reserved_01", Primitive::U32),
        FieldDef::scalar("reserved_02", Primitive::U32),
        FieldDef::array("sphere", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("box_min", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("box_max", Primitive::F32, Count::Fixed(4)),
        FieldDef::scalar("unk_01", Primitive::U32),
        FieldDef::scalar("unk_02", Primitive::U32),
        FieldDef::scalar("unk_03", Primitive::U32),
        FieldDef::scalar("unk_04", Primitive::U32),
        FieldDef::scalar("unk_05", Primitive::U32),
        FieldDef::scalar("unk_06", Primitive::U32),
        FieldDef::scalar("unk_07", Primitive::U32),
        FieldDef::scalar("unk_08", Primitive::U32),
        FieldDef::scalar("unk_09", Primitive::U32),
        FieldDef::scalar("unk_10", Primitive::U32),
        FieldDef::scalar("unk_11", Primitive::U32),
        FieldDef::scalar("reserved_03", Primitive::U32),
        FieldDef::bytes("unk_block_01", Count::Computed(block_01_len)),
        FieldDef::bytes("unk_block_02", Count::Computed(block_02_len)),
        FieldDef::bytes("unk_block_03", Count::Computed(block_03_len)),
        FieldDef::records("bones", &BONE, Count::Field("bone_count")),
        FieldDef::array("bone_matrices", Primitive::F32, Count::Computed(bone_matrix_floats)),
        FieldDef::array("bone_world_matrices", Primitive::F32, Count::Computed(bone_matrix_floats)),
        FieldDef::bytes("animation_mapping", Count::Computed(animation_mapping_len)),
        FieldDef::records("bone_palettes", &BONE_PALETTE, Count::Field("bone_palette_count")),
        FieldDef::records("groups", &GROUP, Count::Field("group_count")),
        FieldDef::bytes("textures", Count::Computed(texture_table_len)),
        FieldDef::records("materials", &MATERIAL, Count::Field("material_count")),
        FieldDef::records("meshes", &MESH, Count::Field("mesh_count")),
        FieldDef::scalar("weight_bound_count", Primitive::U32),
        FieldDef::records("weight_bounds", &WEIGHT_BOUND, Count::Field("weight_bound_count")),
        FieldDef::bytes("vertex_buffer", Count::Field("vertex_buffer_size")),
        FieldDef::bytes("vertex_buffer_2", Count::Field("vertex_buffer_2_size")),
        FieldDef::array("index_buffer", Primitive::U16, Count::Computed(index_count)),
    ],
);

/// Opaque group record
#[derive(Debug, Clone, PartialEq)]
pub struct GroupData {
    pub group_index: u32,
    pub params: [f32; 7],
}

impl SchemaRecord for GroupData {
    fn schema() -> &'static Schema {
        &GROUP
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        Ok(Self {
            group_index: structure.u32("group_index")?,
            params: structure.f32_array("params")?,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("group_index", self.group_index)
            .with("params", self.params)
    }
}

/// A MOD v156 model
#[derive(Debug, Clone, PartialEq)]
pub struct Mod156 {
    pub version_rev: i8,
    /// Total vertices over all meshes
    pub vertex_count: u32,
    pub edge_count: u32,
    pub reserved: [u32; 3],
    /// Centre and radius
    pub sphere: Vec4,
    pub box_min: Vec4,
    pub box_max: Vec4,
    /// Opaque header words. Words 8, 9 and 10 size the opaque blocks and
    /// are rewritten from them on serialisation.
    pub unknowns: [u32; 11],
    /// Opaque blocks of 4, 16 and 8 byte records
    pub unk_blocks: [Bytes; 3],
    pub bones: Vec<Bone>,
    pub bone_matrices: Vec<Mat4>,
    pub bone_world_matrices: Vec<Mat4>,
    /// 256 global bone indices, present when the model has palettes
    pub animation_mapping: Vec<u8>,
    pub bone_palettes: Vec<BonePalette>,
    pub groups: Vec<GroupData>,
    /// Texture paths without extension
    pub textures: Vec<String>,
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub weight_bounds: Vec<WeightBound>,
    pub vertex_buffer: Bytes,
    pub vertex_buffer_2: Bytes,
    /// Triangle strips of every mesh
    pub index_buffer: Vec<u16>,
}

impl Default for Mod156 {
    fn default() -> Self {
        Self {
            version_rev: 1,
            vertex_count: 0,
            edge_count: 0,
            reserved: [0; 3],
            sphere: Vec4::ZERO,
            box_min: Vec4::ZERO,
            box_max: Vec4::ZERO,
            unknowns: [0; 11],
            unk_blocks: Default::default(),
            bones: Vec::new(),
            bone_matrices: Vec::new(),
            bone_world_matrices: Vec::new(),
            animation_mapping: Vec::new(),
            bone_palettes: Vec::new(),
            groups: Vec::new(),
            textures: Vec::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
            weight_bounds: Vec::new(),
            vertex_buffer: Bytes::new(),
            vertex_buffer_2: Bytes::new(),
            index_buffer: Vec::new(),
        }
    }
}

/// One decoded vertex
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Engine space
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Option<Vec3>,
    /// Every UV channel of the layout, `None` where absent
    pub uvs: Vec<Option<[f32; 2]>>,
    /// Global bone index and weight byte, empty for rigid layouts
    pub weights: Vec<(u8, u8)>,
}

/// Vertices and strip indices of one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMesh {
    pub index: usize,
    pub layout: &'static VertexLayout,
    pub vertices: Vec<Vertex>,
    pub strip: Vec<u16>,
}

impl DecodedMesh {
    /// Strip expanded into triangles with mesh-local indices.
    pub fn triangles(&self) -> Vec<[u16; 3]> {
        strip_to_triangles(&self.strip)
    }

    /// Vertex index and weight in `0..=1` for every influencing bone.
    pub fn weights_per_bone(&self) -> BTreeMap<u8, Vec<(usize, f32)>> {
        let mut per_bone: BTreeMap<u8, Vec<(usize, f32)>> = BTreeMap::new();
        for (vertex_index, vertex) in self.vertices.iter().enumerate() {
            for &(bone, weight) in &vertex.weights {
                per_bone
                    .entry(bone)
                    .or_default()
                    .push((vertex_index, f32::from(weight) / 255.0));
            }
        }
        per_bone
    }
}

/// Result of decoding every mesh of a model
#[derive(Debug, Default)]
pub struct MeshDecodeReport {
    pub meshes: Vec<DecodedMesh>,
    /// Meshes that failed, with the reason
    pub failures: Vec<(usize, ModError)>,
}

fn count_field<T: TryFrom<usize>>(len: usize, target: &'static str) -> Result<T> {
    T::try_from(len).map_err(|_| {
        DataError::ValueOutOfRange {
            value: len.to_string(),
            target,
        }
        .into()
    })
}

fn matrices(structure: &Structure, name: &str) -> Result<Vec<Mat4>> {
    Ok(structure
        .f32s(name)?
        .chunks_exact(16)
        .map(Mat4::from_cols_slice)
        .collect())
}

fn flatten(matrices: &[Mat4]) -> Vec<f32> {
    matrices.iter().flat_map(Mat4::to_cols_array).collect()
}

impl Mod156 {
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        let data: Bytes = data.into();
        let magic = data.get(..4).unwrap_or(&data[..]);
        if magic != MOD_MAGIC {
            return Err(ModError::WrongMagic(magic_to_string(
                &<[u8; 4]>::try_from(magic).unwrap_or_default(),
            )));
        }
        let version = data.get(4).copied().unwrap_or_default();
        if version != MOD_VERSION {
            return Err(DataError::unsupported("MOD version", version).into());
        }

        let structure = MOD156.parse(data)?;
        debug!(
            "MOD v{} with {} bones, {} meshes, {} materials, {} textures",
            version,
            structure.count("bones")?,
            structure.count("meshes")?,
            structure.count("materials")?,
            structure.count("textures")? / TEXTURE_PATH_SIZE
        );

        let mut unknowns = [0u32; 11];
        for (slot, name) in unknowns.iter_mut().zip(UNKNOWN_FIELDS) {
            *slot = structure.u32(name)?;
        }

        Ok(Self {
            version_rev: structure.i8("version_rev")?,
            vertex_count: structure.u32("vertex_count")?,
            edge_count: structure.u32("edge_count")?,
            reserved: [
                structure.u32("reserved_01")?,
                structure.u32("reserved_02")?,
                structure.u32("reserved_03")?,
            ],
            sphere: Vec4::from_array(structure.f32_array("sphere")?),
            box_min: Vec4::from_array(structure.f32_array("box_min")?),
            box_max: Vec4::from_array(structure.f32_array("box_max")?),
            unknowns,
            unk_blocks: [
                structure.bytes("unk_block_01")?,
                structure.bytes("unk_block_02")?,
                structure.bytes("unk_block_03")?,
            ],
            bones: structure.records_as("bones")?,
            bone_matrices: matrices(&structure, "bone_matrices")?,
            bone_world_matrices: matrices(&structure, "bone_world_matrices")?,
            animation_mapping: structure.u8s("animation_mapping")?,
            bone_palettes: structure.records_as("bone_palettes")?,
            groups: structure.records_as("groups")?,
            textures: structure
                .bytes("textures")?
                .chunks_exact(TEXTURE_PATH_SIZE)
                .map(decode_texture_path)
                .collect(),
            materials: structure.records_as("materials")?,
            meshes: structure.records_as("meshes")?,
            weight_bounds: structure.records_as("weight_bounds")?,
            vertex_buffer: structure.bytes("vertex_buffer")?,
            vertex_buffer_2: structure.bytes("vertex_buffer_2")?,
            index_buffer: structure.u16s("index_buffer")?,
        })
    }

    /// Lay the model out, deriving counts and section offsets.
    pub fn to_structure(&self) -> Result<Structure> {
        let mut textures = Vec::with_capacity(self.textures.len() * TEXTURE_PATH_SIZE);
        for path in &self.textures {
            validate_texture_path(path)?;
            let mut field = [0u8; TEXTURE_PATH_SIZE];
            field[..path.len()].copy_from_slice(path.as_bytes());
            textures.extend_from_slice(&field);
        }

        let mut unknowns = self.unknowns;
        unknowns[9] = count_field(self.unk_blocks[0].len() / UNK_BLOCK_SIZES[0], "u32")?;
        unknowns[8] = count_field(self.unk_blocks[1].len() / UNK_BLOCK_SIZES[1], "u32")?;
        unknowns[7] = count_field(self.unk_blocks[2].len() / UNK_BLOCK_SIZES[2], "u32")?;

        let mut values = FieldValues::new();
        values
            .set("magic", *MOD_MAGIC)
            .set("version", MOD_VERSION)
            .set("version_rev", self.version_rev)
            .set("bone_count", count_field::<u16>(self.bones.len(), "u16")?)
            .set("mesh_count", count_field::<i16>(self.meshes.len(), "i16")?)
            .set("material_count", count_field::<u16>(self.materials.len(), "u16")?)
            .set("vertex_count", self.vertex_count)
            .set("face_count", count_field::<u32>(self.index_buffer.len() + 1, "u32")?)
            .set("edge_count", self.edge_count)
            .set("vertex_buffer_size", count_field::<u32>(self.vertex_buffer.len(), "u32")?)
            .set("vertex_buffer_2_size", count_field::<u32>(self.vertex_buffer_2.len(), "u32")?)
            .set("texture_count", count_field::<u32>(self.textures.len(), "u32")?)
            .set("group_count", count_field::<u32>(self.groups.len(), "u32")?)
            .set("bone_palette_count", count_field::<u32>(self.bone_palettes.len(), "u32")?)
            .set("reserved_01", self.reserved[0])
            .set("reserved_02", self.reserved[1])
            .set("reserved_03", self.reserved[2])
            .set("sphere", self.sphere.to_array())
            .set("box_min", self.box_min.to_array())
            .set("box_max", self.box_max.to_array())
            .set("unk_block_01", self.unk_blocks[0].clone())
            .set("unk_block_02", self.unk_blocks[1].clone())
            .set("unk_block_03", self.unk_blocks[2].clone())
            .set("bones", records_value(&self.bones)?)
            .set("bone_matrices", flatten(&self.bone_matrices))
            .set("bone_world_matrices", flatten(&self.bone_world_matrices))
            .set("bone_palettes", records_value(&self.bone_palettes)?)
            .set("groups", records_value(&self.groups)?)
            .set("textures", textures)
            .set("materials", records_value(&self.materials)?)
            .set("meshes", records_value(&self.meshes)?)
            .set("weight_bound_count", count_field::<u32>(self.weight_bounds.len(), "u32")?)
            .set("weight_bounds", records_value(&self.weight_bounds)?)
            .set("vertex_buffer", self.vertex_buffer.clone())
            .set("vertex_buffer_2", self.vertex_buffer_2.clone())
            .set("index_buffer", self.index_buffer.clone());
        for (name, value) in UNKNOWN_FIELDS.into_iter().zip(unknowns) {
            values.set(name, value);
        }
        if !self.bone_palettes.is_empty() {
            values.set("animation_mapping", self.animation_mapping.clone());
        }

        Ok(MOD156.construct(values)?)
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(self.to_structure()?.as_bytes())
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.box_min.truncate(), self.box_max.truncate())
    }

    pub fn face_count(&self) -> usize {
        self.index_buffer.len() + 1
    }

    /// Global bone for a palette-local index.
    ///
    /// Indices below the palette's declared count go through the palette,
    /// others through the animation mapping. Anything neither covers is
    /// taken as a global index already.
    pub fn resolve_bone(&self, palette: Option<&BonePalette>, local: u8) -> u8 {
        if let Some(bone) = palette.and_then(|palette| palette.get(local)) {
            return bone;
        }
        if let Some(&bone) = self.animation_mapping.get(usize::from(local)) {
            return bone;
        }
        trace!("Bone index {local} outside palette and mapping, using it as is");
        local
    }

    /// Strip indices of a mesh, bounds checked against the index buffer.
    pub fn mesh_indices(&self, mesh: &Mesh) -> Result<Vec<u16>> {
        let start = mesh.index_byte_offset() / 2;
        let end = start + u64::from(mesh.face_count);
        let available = self.index_buffer.len() as u64;
        if end > available {
            error!(
                "Mesh indices {}..{} outside an index buffer of {} entries",
                start, end, available
            );
            return Err(DataError::malformed(
                "Mod156.index_buffer",
                format!("mesh indices {start}..{end} exceed {available} entries"),
            )
            .into());
        }
        Ok(self.index_buffer[start as usize..end as usize].to_vec())
    }

    /// Vertices and strip of one mesh.
    pub fn decode_mesh(&self, index: usize) -> Result<DecodedMesh> {
        let mesh = self.meshes.get(index).ok_or_else(|| {
            DataError::malformed("Mod156.meshes", format!("mesh index {index} out of range"))
        })?;
        let layout = layout_for(mesh.vertex_format)?;

        let start = mesh.vertex_byte_offset();
        let count = mesh.resolved_vertex_count();
        let stride = layout.size().max(usize::from(mesh.vertex_stride));
        let end = start + (count * stride) as u64;
        if end > self.vertex_buffer.len() as u64 {
            error!(
                "Mesh {} vertices {:#x}..{:#x} outside a vertex buffer of {} bytes",
                index,
                start,
                end,
                self.vertex_buffer.len()
            );
            return Err(DataError::malformed(
                format!("Mod156.meshes[{index}]"),
                format!(
                    "vertex range {start:#x}..{end:#x} exceeds {} bytes",
                    self.vertex_buffer.len()
                ),
            )
            .into());
        }

        let bbox = self.bounding_box();
        let palette = if layout.is_skinned() {
            let palette = self.bone_palettes.get(usize::from(mesh.bone_palette_index));
            if palette.is_none() {
                warn!(
                    "Mesh {} refers to missing bone palette {}",
                    index, mesh.bone_palette_index
                );
            }
            palette
        } else {
            None
        };

        let raw = &self.vertex_buffer[start as usize..end as usize];
        let vertices = raw
            .chunks_exact(stride)
            .map(|record| -> Result<Vertex> {
                let packed = decode_vertex(layout, record, &bbox)?;
                let weights = packed
                    .influences
                    .iter()
                    .filter(|&&(local, weight)| local != 0 || weight != 0)
                    .map(|&(local, weight)| (self.resolve_bone(palette, local), weight))
                    .collect();
                Ok(Vertex {
                    position: packed.position,
                    normal: packed.normal,
                    tangent: packed.tangent,
                    uvs: (0..packed.uvs.len()).map(|channel| packed.uv(channel)).collect(),
                    weights,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DecodedMesh {
            index,
            layout,
            vertices,
            strip: self.mesh_indices(mesh)?,
        })
    }

    /// Decode every mesh, recording failures and carrying on.
    pub fn decode_meshes(&self) -> MeshDecodeReport {
        let mut report = MeshDecodeReport::default();
        for index in 0..self.meshes.len() {
            match self.decode_mesh(index) {
                Ok(mesh) => report.meshes.push(mesh),
                Err(e) => {
                    warn!("Skipping mesh {index}: {e}");
                    report.failures.push((index, e));
                }
            }
        }
        report
    }

    /// Ancestors of a bone, nearest first.
    pub fn bone_parents(&self, index: usize) -> Vec<u8> {
        crate::bone::bone_parents(&self.bones, index)
    }

    pub fn bone_world_positions(&self) -> Vec<Vec3> {
        crate::bone::bone_world_positions(&self.bones)
    }

    /// Bones no decodable vertex is weighted to.
    pub fn non_deform_bones(&self) -> BTreeSet<usize> {
        let mut bones: BTreeSet<usize> = (0..self.bones.len()).collect();
        for mesh in self.decode_meshes().meshes {
            for vertex in &mesh.vertices {
                for &(bone, _) in &vertex.weights {
                    bones.remove(&usize::from(bone));
                }
            }
        }
        bones
    }

    /// Directory of every texture, keyed by file name.
    pub fn texture_dirs(&self) -> BTreeMap<String, String> {
        texture_dirs(&self.textures)
    }

    pub fn default_texture_dir(&self) -> Option<String> {
        default_texture_dir(&self.textures)
    }
}
