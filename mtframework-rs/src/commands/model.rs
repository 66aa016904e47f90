//! MOD model command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use mtf_mod::{Mod156, TextureSlot};

use super::read_input;
use crate::utils::{format_bytes, format_vec3, listing, properties, push_row};

#[derive(Subcommand)]
pub enum ModCommands {
    /// Display information about a MOD file
    Info {
        /// Path to the MOD file
        file: PathBuf,

        /// List bones and materials as well
        #[arg(long)]
        detailed: bool,
    },

    /// Decode every mesh and list the results
    Meshes {
        /// Path to the MOD file
        file: PathBuf,

        /// Include secondary level of detail meshes
        #[arg(long)]
        all: bool,
    },
}

pub fn execute(command: ModCommands) -> Result<()> {
    match command {
        ModCommands::Info { file, detailed } => show_info(&file, detailed),
        ModCommands::Meshes { file, all } => list_meshes(&file, all),
    }
}

fn load(path: &Path) -> Result<Mod156> {
    Mod156::parse(read_input(path)?)
        .with_context(|| format!("Failed to parse model {}", path.display()))
}

fn show_info(path: &Path, detailed: bool) -> Result<()> {
    let model = load(path)?;
    let bbox = model.bounding_box();

    println!("=== MOD Model: {} ===", path.display());
    properties(&[
        ("Version", format!("{}.{}", mtf_mod::MOD_VERSION, model.version_rev)),
        ("Bones", model.bones.len().to_string()),
        ("Bone palettes", model.bone_palettes.len().to_string()),
        ("Groups", model.groups.len().to_string()),
        ("Materials", model.materials.len().to_string()),
        ("Meshes", model.meshes.len().to_string()),
        ("Vertices", model.vertex_count.to_string()),
        ("Faces", model.face_count().to_string()),
        ("Vertex buffer", format_bytes(model.vertex_buffer.len() as u64)),
        ("Weight bounds", model.weight_bounds.len().to_string()),
        ("Box min", format_vec3(bbox.min.to_array())),
        ("Box max", format_vec3(bbox.max.to_array())),
        (
            "Texture directory".into(),
            model.default_texture_dir().unwrap_or_default(),
        ),
    ])
    .printstd();

    if !model.textures.is_empty() {
        println!("\nTextures:");
        for (index, texture) in model.textures.iter().enumerate() {
            println!("  {index:3}: {texture}");
        }
    }

    if detailed {
        let mut bones = listing(&["Bone", "Parent", "Mirror", "Anim map", "Location"]);
        for (index, bone) in model.bones.iter().enumerate() {
            push_row(&mut bones, [
                index.to_string(),
                if bone.is_root() {
                    "-".to_string()
                } else {
                    bone.parent_index.to_string()
                },
                bone.mirror_index.to_string(),
                bone.anim_map_index.to_string(),
                format_vec3(bone.location.to_array()),
            ]);
        }
        println!("\nBones:");
        bones.printstd();

        let mut materials = listing(&["Material", "Slot", "Texture"]);
        for (index, material) in model.materials.iter().enumerate() {
            for slot in TextureSlot::ALL {
                if let Some(texture) = material.texture(slot) {
                    push_row(&mut materials, [
                        index.to_string(),
                        format!("{slot:?}"),
                        model
                            .textures
                            .get(texture)
                            .cloned()
                            .unwrap_or_else(|| format!("<missing {texture}>")),
                    ]);
                }
            }
        }
        println!("\nMaterial textures:");
        materials.printstd();

        let non_deform = model.non_deform_bones();
        if !non_deform.is_empty() {
            println!("\nBones without vertex weights: {non_deform:?}");
        }
    }

    Ok(())
}

fn list_meshes(path: &Path, all: bool) -> Result<()> {
    let model = load(path)?;
    let report = model.decode_meshes();

    let mut table = listing(&[
        "Mesh", "Material", "LOD", "Format", "Vertices", "Triangles", "Palette", "Shadows",
    ]);
    for mesh in &report.meshes {
        let descriptor = &model.meshes[mesh.index];
        if descriptor.is_secondary_lod() && !all {
            continue;
        }
        push_row(&mut table, [
            mesh.index.to_string(),
            descriptor.material_index.to_string(),
            descriptor.level_of_detail.to_string(),
            mesh.layout.code.to_string(),
            mesh.vertices.len().to_string(),
            mesh.triangles().len().to_string(),
            if mesh.layout.is_skinned() {
                descriptor.bone_palette_index.to_string()
            } else {
                "-".to_string()
            },
            descriptor.casts_shadows().to_string(),
        ]);
    }
    table.printstd();

    for (index, error) in &report.failures {
        println!("Mesh {index} failed: {error}");
    }
    println!(
        "{} of {} meshes decoded",
        report.meshes.len(),
        model.meshes.len()
    );
    Ok(())
}
