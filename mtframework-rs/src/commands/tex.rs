//! TEX texture command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use mtf_tex::format::tag_to_string;
use mtf_tex::{DdsImage, Tex112};

use super::{output_path, read_input, write_output};
use crate::utils::{format_bytes, listing, properties, push_row};

#[derive(Subcommand)]
pub enum TexCommands {
    /// Display information about a TEX file
    Info {
        /// Path to the TEX file
        file: PathBuf,

        /// Show the mip offset table
        #[arg(long)]
        mipmaps: bool,
    },

    /// Convert a TEX file to DDS
    ToDds {
        /// Input TEX file
        input: PathBuf,

        /// Output DDS file (defaults to the input with a .dds extension)
        output: Option<PathBuf>,
    },

    /// Convert a DDS file to TEX
    FromDds {
        /// Input DDS file
        input: PathBuf,

        /// Output TEX file (defaults to the input with a .tex extension)
        output: Option<PathBuf>,
    },
}

pub fn execute(command: TexCommands) -> Result<()> {
    match command {
        TexCommands::Info { file, mipmaps } => show_info(&file, mipmaps),
        TexCommands::ToDds { input, output } => to_dds(&input, output.as_deref()),
        TexCommands::FromDds { input, output } => from_dds(&input, output.as_deref()),
    }
}

fn show_info(path: &Path, mipmaps: bool) -> Result<()> {
    let tex = Tex112::parse(read_input(path)?)
        .with_context(|| format!("Failed to parse texture {}", path.display()))?;

    println!("=== TEX Texture: {} ===", path.display());
    let format = tex
        .pixel_format()
        .map_or_else(|e| e.to_string(), |format| format.to_string());
    properties(&[
        ("Version", tex.version.to_string()),
        ("Revision", tex.revision.to_string()),
        ("Dimensions", format!("{}x{}", tex.width, tex.height)),
        ("Mipmaps", tex.mipmap_count.to_string()),
        ("Images", tex.image_count.to_string()),
        ("Compression tag", tag_to_string(&tex.compression)),
        ("Pixel format", format),
        ("Payload offset", format!("{:#x}", tex.data_offset())),
        ("Payload size", format_bytes(tex.data.len() as u64)),
    ])
    .printstd();

    if mipmaps {
        let levels = usize::from(tex.mipmap_count).max(1);
        let mut table = listing(&["Image", "Level", "Offset", "Size"]);
        for (index, &offset) in tex.mipmap_offsets.iter().enumerate() {
            let size = tex
                .pixel_format()
                .map(|format| {
                    format.level_size(
                        u32::from(tex.width),
                        u32::from(tex.height),
                        (index % levels) as u32,
                    )
                })
                .unwrap_or_default();
            push_row(&mut table, [
                (index / levels).to_string(),
                (index % levels).to_string(),
                format!("{offset:#x}"),
                format_bytes(size as u64),
            ]);
        }
        table.printstd();
    }

    Ok(())
}

fn to_dds(input: &Path, output: Option<&Path>) -> Result<()> {
    let data = mtf_tex::tex_to_dds(read_input(input)?)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    let target = output_path(input, output, "dds");
    write_output(&target, &data)?;
    println!("Wrote {}", target.display());
    Ok(())
}

fn from_dds(input: &Path, output: Option<&Path>) -> Result<()> {
    let dds = DdsImage::parse(read_input(input)?)
        .with_context(|| format!("Failed to parse DDS {}", input.display()))?;
    let tex = Tex112::from_dds(&dds)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    let target = output_path(input, output, "tex");
    write_output(&target, &tex.to_bytes()?)?;
    println!(
        "Wrote {} ({}x{}, {} levels)",
        target.display(),
        tex.width,
        tex.height,
        tex.mipmap_count
    );
    Ok(())
}
