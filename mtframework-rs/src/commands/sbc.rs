//! SBC collision command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use mtf_sbc::Sbc1;

use super::read_input;
use crate::utils::{format_vec3, listing, properties, push_row};

#[derive(Subcommand)]
pub enum SbcCommands {
    /// Display information about an SBC collision file
    Info {
        /// Path to the SBC file
        file: PathBuf,

        /// List every collision group
        #[arg(long)]
        groups: bool,
    },
}

pub fn execute(command: SbcCommands) -> Result<()> {
    match command {
        SbcCommands::Info { file, groups } => show_info(&file, groups),
    }
}

fn show_info(path: &Path, groups: bool) -> Result<()> {
    let sbc = Sbc1::parse(read_input(path)?)
        .with_context(|| format!("Failed to parse collision {}", path.display()))?;

    let unresolved = sbc
        .triangles
        .iter()
        .filter(|triangle| sbc.triangle_positions(triangle).is_none())
        .count();

    println!("=== SBC1 Collision: {} ===", path.display());
    properties(&[
        ("Boxes", sbc.boxes.len().to_string()),
        ("Groups", sbc.groups.len().to_string()),
        ("Triangles", sbc.triangles.len().to_string()),
        ("Vertices", sbc.vertices.len().to_string()),
        ("Out of range triangles", unresolved.to_string()),
        ("Box min", format_vec3(sbc.bbox.min.to_array())),
        ("Box max", format_vec3(sbc.bbox.max.to_array())),
    ])
    .printstd();

    if groups {
        let mut table = listing(&[
            "Group", "Id", "First triangle", "First box", "First vertex", "Box min", "Box max",
        ]);
        for (index, group) in sbc.groups.iter().enumerate() {
            push_row(&mut table, [
                index.to_string(),
                group.group_id.to_string(),
                group.start_triangles.to_string(),
                group.start_boxes.to_string(),
                group.start_vertices.to_string(),
                format_vec3(group.box_a.min.to_array()),
                format_vec3(group.box_a.max.to_array()),
            ]);
        }
        table.printstd();
    }

    Ok(())
}
