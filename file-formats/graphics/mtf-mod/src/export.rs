//! Building a model from edited meshes.
//!
//! Export rewrites the geometry, materials and textures of a template
//! model and keeps its skeleton and opaque sections untouched.

use std::collections::BTreeSet;

use bytes::Bytes;
use glam::Vec3;
use log::{debug, warn};

use crate::bone::bone_world_positions;
use crate::bounds::{STATIC_BONE_ID, WeightBound, model_bounds};
use crate::error::{ModError, Result};
use crate::material::{Material, MaterialFlags, encode_texture_path};
use crate::mesh::{Mesh, MeshFlags};
use crate::model::Mod156;
use crate::palette::{pack_bone_palettes, palette_of_meshes};
use crate::strip::triangles_to_strip;
use crate::vertex::{PackedVertex, encode_vertex, layout_for, pack_color, pack_uv};
use crate::weights::quantize_weights;
use mtf_data::half_float::ABSENT_CHANNEL;

/// Level of detail tag written on exported meshes
pub const EXPORT_LEVEL_OF_DETAIL: u8 = 255;

pub const EXPORT_VERTEX_STRIDE: u8 = 32;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub level_of_detail: u8,
    /// Bytes between vertex records, at least the 32 byte record size
    pub vertex_stride: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            level_of_detail: EXPORT_LEVEL_OF_DETAIL,
            vertex_stride: EXPORT_VERTEX_STRIDE,
        }
    }
}

/// One vertex in engine space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Option<[f32; 2]>,
    /// Lightmap channel
    pub uv2: Option<[f32; 2]>,
    /// Vertex colour, written for rigid meshes whose material asks for it
    pub color: Option<[u8; 4]>,
    /// Global bone index and weight
    pub weights: Vec<(u8, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportMesh {
    pub vertices: Vec<ExportVertex>,
    /// Mesh-local triangles
    pub triangles: Vec<[u16; 3]>,
    pub material_index: u16,
    /// Descriptor fields carried over as is: render group, z order and
    /// the opaque words
    pub settings: Mesh,
    pub cast_shadows: bool,
}

impl ExportMesh {
    pub fn new(vertices: Vec<ExportVertex>, triangles: Vec<[u16; 3]>, material_index: u16) -> Self {
        Self {
            vertices,
            triangles,
            material_index,
            settings: Mesh::template(),
            cast_shadows: true,
        }
    }

    /// Every bone with an influence on some vertex.
    pub fn bones(&self) -> BTreeSet<u8> {
        self.vertices
            .iter()
            .flat_map(|vertex| vertex.weights.iter().map(|&(bone, _)| bone))
            .collect()
    }

    pub fn has_weights(&self) -> bool {
        self.vertices.iter().any(|vertex| !vertex.weights.is_empty())
    }
}

/// Geometry, materials and textures of the model to write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportModel {
    pub meshes: Vec<ExportMesh>,
    pub materials: Vec<Material>,
    /// Texture paths, extension included
    pub textures: Vec<String>,
}

struct MeshOutput {
    mesh: Mesh,
    vertex_data: Vec<u8>,
    strip: Vec<u16>,
    bounds: Vec<WeightBound>,
}

/// Build a MOD v156 model from `model`, keeping the skeleton, groups,
/// opaque header words and secondary vertex buffer of `template`.
pub fn export_mod156(template: &Mod156, model: &ExportModel, options: &ExportOptions) -> Result<Mod156> {
    let has_skeleton = !template.bones.is_empty();
    let skinned: Vec<bool> = model
        .meshes
        .iter()
        .enumerate()
        .map(|(index, mesh)| {
            let weighted = mesh.has_weights();
            if weighted && !has_skeleton {
                warn!("Mesh {index} has bone weights but the template has no bones, exporting it rigid");
            }
            weighted && has_skeleton
        })
        .collect();

    let groups = if has_skeleton {
        let bone_sets: Vec<BTreeSet<u8>> = model
            .meshes
            .iter()
            .zip(&skinned)
            .map(|(mesh, &skinned)| if skinned { mesh.bones() } else { BTreeSet::new() })
            .collect();
        pack_bone_palettes(&bone_sets)?
    } else {
        Vec::new()
    };
    let assignment = palette_of_meshes(&groups, model.meshes.len());
    let palettes: Vec<_> = groups.iter().map(|group| group.to_palette()).collect();
    debug!("Packed {} bone palettes for {} meshes", palettes.len(), model.meshes.len());

    let points: Vec<Vec3> = model
        .meshes
        .iter()
        .flat_map(|mesh| mesh.vertices.iter().map(|vertex| vertex.position))
        .collect();
    let (bbox, sphere) = model_bounds(&points);

    let textures = model
        .textures
        .iter()
        .map(|path| -> Result<String> {
            Ok(String::from_utf8_lossy(&encode_texture_path(path)?).into_owned())
        })
        .collect::<Result<Vec<_>>>()?;

    let mut materials = model.materials.clone();
    for (index, mesh) in model.meshes.iter().enumerate() {
        let material = materials
            .get_mut(usize::from(mesh.material_index))
            .ok_or_else(|| {
                ModError::invalid_mesh(index, format!("material {} does not exist", mesh.material_index))
            })?;
        if skinned[index] {
            material.flags.remove(MaterialFlags::EIGHT_BONES_VERTEX);
        }
    }

    let world_positions = bone_world_positions(&template.bones);
    let mut vertex_buffer = Vec::new();
    let mut index_buffer = Vec::new();
    let mut meshes = Vec::with_capacity(model.meshes.len());
    let mut weight_bounds = Vec::new();
    let mut vertex_position = 0usize;

    for (index, mesh) in model.meshes.iter().enumerate() {
        let palette_index = if skinned[index] { assignment[index] } else { None };
        let output = export_mesh(
            index,
            mesh,
            &MeshContext {
                options,
                bbox: &bbox,
                material: &materials[usize::from(mesh.material_index)],
                palette: palette_index.map(|palette| (palette, &palettes[palette])),
                world_positions: &world_positions,
                vertex_position,
                face_position: index_buffer.len(),
            },
        )?;
        vertex_position += mesh.vertices.len();
        vertex_buffer.extend_from_slice(&output.vertex_data);
        index_buffer.extend_from_slice(&output.strip);
        weight_bounds.extend(output.bounds);
        meshes.push(output.mesh);
    }

    Ok(Mod156 {
        version_rev: 1,
        vertex_count: u32::try_from(vertex_position)
            .map_err(|_| ModError::invalid_mesh(model.meshes.len(), "too many vertices"))?,
        edge_count: 0,
        reserved: [0; 3],
        sphere: sphere.to_vec4(),
        box_min: bbox.min.extend(0.0),
        box_max: bbox.max.extend(0.0),
        unknowns: template.unknowns,
        unk_blocks: template.unk_blocks.clone(),
        bones: template.bones.clone(),
        bone_matrices: template.bone_matrices.clone(),
        bone_world_matrices: template.bone_world_matrices.clone(),
        animation_mapping: template.animation_mapping.clone(),
        bone_palettes: palettes,
        groups: template.groups.clone(),
        textures,
        materials,
        meshes,
        weight_bounds,
        vertex_buffer: Bytes::from(vertex_buffer),
        vertex_buffer_2: template.vertex_buffer_2.clone(),
        index_buffer,
    })
}

struct MeshContext<'a> {
    options: &'a ExportOptions,
    bbox: &'a mtf_data::types::BoundingBox,
    material: &'a Material,
    palette: Option<(usize, &'a crate::bone::BonePalette)>,
    world_positions: &'a [Vec3],
    vertex_position: usize,
    face_position: usize,
}

fn export_mesh(index: usize, mesh: &ExportMesh, context: &MeshContext<'_>) -> Result<MeshOutput> {
    let vertex_count = u16::try_from(mesh.vertices.len())
        .map_err(|_| ModError::invalid_mesh(index, "more than 65535 vertices"))?;
    let position = u16::try_from(context.vertex_position + mesh.vertices.len())
        .map(|_| context.vertex_position as u16)
        .map_err(|_| ModError::invalid_mesh(index, "vertex indices overflow 16 bits"))?;

    let quantized: Vec<Vec<(u8, u8)>> = if context.palette.is_some() {
        mesh.vertices
            .iter()
            .map(|vertex| quantize_weights(&vertex.weights))
            .collect()
    } else {
        vec![Vec::new(); mesh.vertices.len()]
    };
    let max_influences = quantized.iter().map(Vec::len).max().unwrap_or(0);
    let layout = layout_for(max_influences as u8)?;

    let stride = usize::from(context.options.vertex_stride);
    if stride < layout.size() {
        return Err(ModError::invalid_mesh(
            index,
            format!("vertex stride {stride} is below the {} byte record", layout.size()),
        ));
    }

    let vertex_colors = !layout.is_skinned()
        && context
            .material
            .flags
            .contains(MaterialFlags::EIGHT_BONES_VERTEX);

    let mut vertex_data = Vec::with_capacity(mesh.vertices.len() * stride);
    for (vertex, weights) in mesh.vertices.iter().zip(&quantized) {
        let influences = match context.palette {
            Some((_, palette)) => weights
                .iter()
                .map(|&(bone, weight)| {
                    palette.position(bone).map(|local| (local, weight)).ok_or_else(|| {
                        ModError::invalid_mesh(index, format!("bone {bone} is missing from its palette"))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let mut uvs = vec![
            pack_uv(vertex.uv.unwrap_or([0.0, 0.0])),
            vertex.uv2.map_or([ABSENT_CHANNEL; 2], pack_uv),
        ];
        if vertex_colors {
            uvs.push(pack_color(vertex.color.unwrap_or([255; 4])));
        }

        let packed = PackedVertex {
            position: vertex.position,
            normal: vertex.normal,
            tangent: Some(vertex.tangent),
            uvs,
            influences,
        };
        let mut record = encode_vertex(layout, &packed, context.bbox)?;
        record.resize(stride, 0);
        vertex_data.extend_from_slice(&record);
    }

    if let Some(triangle) = mesh
        .triangles
        .iter()
        .find(|triangle| triangle.iter().any(|&vertex| vertex >= vertex_count))
    {
        return Err(ModError::invalid_mesh(
            index,
            format!("triangle {triangle:?} refers past {vertex_count} vertices"),
        ));
    }
    let strip: Vec<u16> = triangles_to_strip(&mesh.triangles)
        .into_iter()
        .map(|vertex| vertex + position)
        .collect();

    let skinned = context.palette.is_some();
    let bones = mesh.bones();
    let bounds = if skinned {
        bones
            .iter()
            .map(|&bone| -> Result<Option<WeightBound>> {
                let origin = *context.world_positions.get(usize::from(bone)).ok_or_else(|| {
                    ModError::invalid_mesh(index, format!("bone {bone} is not in the skeleton"))
                })?;
                let points: Vec<Vec3> = mesh
                    .vertices
                    .iter()
                    .filter(|vertex| vertex.weights.iter().any(|&(candidate, _)| candidate == bone))
                    .map(|vertex| vertex.position)
                    .collect();
                Ok(WeightBound::from_points(u32::from(bone), &points, origin))
            })
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>>>()?
    } else {
        let points: Vec<Vec3> = mesh.vertices.iter().map(|vertex| vertex.position).collect();
        WeightBound::from_points(STATIC_BONE_ID, &points, Vec3::ZERO)
            .into_iter()
            .collect()
    };

    let mut flags = mesh.settings.flags;
    flags.set(MeshFlags::CAST_SHADOWS, mesh.cast_shadows);

    let descriptor = Mesh {
        material_index: mesh.material_index,
        constant: 1,
        level_of_detail: context.options.level_of_detail,
        vertex_format: layout.code,
        vertex_stride: context.options.vertex_stride,
        unk_03: 0,
        flags,
        vertex_count,
        vertex_index_end: (position + vertex_count).saturating_sub(1),
        vertex_index_start_1: u32::from(position),
        vertex_offset: 0,
        face_position: context.face_position as u32,
        face_count: strip.len() as u32,
        face_offset: 0,
        vertex_index_start_2: position,
        vertex_group_count: if skinned { bones.len() as u8 } else { 1 },
        bone_palette_index: context.palette.map_or(0, |(palette, _)| palette as u8),
        ..mesh.settings.clone()
    };

    Ok(MeshOutput {
        mesh: descriptor,
        vertex_data,
        strip,
        bounds,
    })
}
