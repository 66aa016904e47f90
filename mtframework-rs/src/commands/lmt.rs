//! LMT animation command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use mtf_lmt::{Lmt, LmtOptions, lmt::DEFAULT_MAX_SAMPLES};

use super::read_input;
use crate::utils::{listing, push_row};

#[derive(Subcommand)]
pub enum LmtCommands {
    /// Display the animation blocks of an LMT file
    Info {
        /// Path to the LMT file
        file: PathBuf,

        /// Decode every block and list per-bone sample counts
        #[arg(long)]
        tracks: bool,

        /// Reject tracks with more samples than this
        #[arg(long, default_value_t = DEFAULT_MAX_SAMPLES)]
        max_samples: usize,
    },
}

pub fn execute(command: LmtCommands) -> Result<()> {
    match command {
        LmtCommands::Info {
            file,
            tracks,
            max_samples,
        } => show_info(&file, tracks, max_samples),
    }
}

fn show_info(path: &Path, tracks: bool, max_samples: usize) -> Result<()> {
    let options = LmtOptions {
        max_samples_per_track: max_samples,
    };
    let lmt = Lmt::parse_with(read_input(path)?, options)
        .with_context(|| format!("Failed to parse animation set {}", path.display()))?;

    println!("=== LMT Animation Set: {} ===", path.display());
    println!("Version: {}", lmt.version);
    println!(
        "Animations: {} of {} slots",
        lmt.blocks.len(),
        lmt.block_offsets.len()
    );

    let mut table = listing(&["Slot", "Offset", "Bones", "Frames"]);
    for (slot, block) in &lmt.blocks {
        push_row(&mut table, [
            slot.to_string(),
            format!("{:#x}", block.offset),
            block.bone_count.to_string(),
            block.frame_count.to_string(),
        ]);
    }
    table.printstd();

    if tracks {
        for (index, (slot, _)) in lmt.blocks.iter().enumerate() {
            let animation = lmt
                .decompress_block(index)
                .with_context(|| format!("Failed to decode slot {slot}"))?;
            println!("\nSlot {} ({} frames):", animation.slot, animation.frame_count);
            let mut bones = listing(&["Bone", "Rotations", "Locations", "IK"]);
            for (bone, samples) in &animation.bones {
                push_row(&mut bones, [
                    bone.to_string(),
                    samples.rotation.len().to_string(),
                    samples.location.len().to_string(),
                    if samples.is_ik { "yes" } else { "" }.to_string(),
                ]);
            }
            bones.printstd();
        }
    }

    Ok(())
}
