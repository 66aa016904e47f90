//! ARC archive command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use mtf_arc::{ArcOptions, Archive, Denylist};

use super::write_output;
use crate::utils::{
    format_bytes, format_compression_ratio, listing, matches_pattern, member_bar, push_row,
    while_busy,
};

#[derive(Subcommand)]
pub enum ArcCommands {
    /// List members of an ARC archive
    List {
        /// Path to the ARC archive
        archive: PathBuf,

        /// Show sizes and compression ratios
        #[arg(short, long)]
        long: bool,

        /// Filter members by pattern (supports wildcards)
        #[arg(short, long)]
        filter: Option<String>,

        /// Glob patterns of files to refuse, separated by `;`
        #[arg(long = "deny", env = "MTF_ARC_DENYLIST", value_delimiter = ';')]
        deny: Vec<String>,
    },

    /// Extract members of an ARC archive into a directory
    Unpack {
        /// Path to the ARC archive
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Only extract members matching this pattern
        #[arg(short, long)]
        filter: Option<String>,

        /// Glob patterns of files to refuse, separated by `;`
        #[arg(long = "deny", env = "MTF_ARC_DENYLIST", value_delimiter = ';')]
        deny: Vec<String>,
    },

    /// Pack a directory into a new ARC archive
    Pack {
        /// Directory whose files become members
        source: PathBuf,

        /// Path for the new archive
        archive: PathBuf,

        /// zlib compression level (0-9)
        #[arg(short = 'l', long, default_value = "6")]
        level: u32,

        /// Glob patterns of files to refuse, separated by `;`
        #[arg(long = "deny", env = "MTF_ARC_DENYLIST", value_delimiter = ';')]
        deny: Vec<String>,
    },
}

pub fn execute(command: ArcCommands) -> Result<()> {
    match command {
        ArcCommands::List {
            archive,
            long,
            filter,
            deny,
        } => list_archive(&archive, long, filter.as_deref(), &options(&deny)?),
        ArcCommands::Unpack {
            archive,
            output,
            filter,
            deny,
        } => unpack_archive(&archive, &output, filter.as_deref(), &options(&deny)?),
        ArcCommands::Pack {
            source,
            archive,
            level,
            deny,
        } => pack_archive(
            &source,
            &archive,
            &options(&deny)?.with_compression_level(level),
        ),
    }
}

fn options(deny: &[String]) -> Result<ArcOptions> {
    let denylist = Denylist::new(deny).context("Invalid denylist pattern")?;
    Ok(ArcOptions::default().with_denylist(denylist))
}

fn open(path: &Path, options: &ArcOptions) -> Result<Archive> {
    while_busy("Opening archive...", || Archive::open(path, options))
        .with_context(|| format!("Failed to open archive {}", path.display()))
}

fn list_archive(path: &Path, long: bool, filter: Option<&str>, options: &ArcOptions) -> Result<()> {
    let archive = open(path, options)?;
    let pattern = filter.unwrap_or("*");

    let mut entries: Vec<_> = archive
        .entries()
        .iter()
        .filter(|entry| matches_pattern(&entry.file_name(), pattern))
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    if entries.is_empty() {
        println!("No members found matching pattern: {pattern}");
        return Ok(());
    }

    if long {
        let mut table = listing(&["Member", "Size", "Compressed", "Ratio"]);
        for entry in entries {
            push_row(&mut table, [
                entry.file_name(),
                format_bytes(u64::from(entry.size)),
                format_bytes(u64::from(entry.compressed_size)),
                format_compression_ratio(u64::from(entry.size), u64::from(entry.compressed_size)),
            ]);
        }
        table.printstd();
    } else {
        for entry in entries {
            println!("{}", entry.file_name());
        }
    }

    Ok(())
}

fn unpack_archive(
    path: &Path,
    output_dir: &Path,
    filter: Option<&str>,
    options: &ArcOptions,
) -> Result<()> {
    let archive = open(path, options)?;
    let pattern = filter.unwrap_or("*");
    let entries: Vec<_> = archive
        .entries()
        .iter()
        .filter(|entry| matches_pattern(&entry.file_name(), pattern))
        .collect();

    let bar = member_bar(entries.len());
    let mut failures = 0usize;

    for entry in &entries {
        bar.set_message(entry.file_name());
        let extracted = entry.relative_path().and_then(|relative| {
            let data = archive.read(entry)?;
            Ok((output_dir.join(relative), data))
        });
        match extracted {
            Ok((target, data)) => write_output(&target, &data)?,
            Err(e) => {
                log::warn!("Failed to extract {}: {}", entry.file_name(), e);
                failures += 1;
            }
        }
        bar.inc(1);
    }

    bar.finish_and_clear();
    if failures > 0 {
        bail!("{failures} of {} members could not be extracted", entries.len());
    }
    println!(
        "Extracted {} members to {}",
        entries.len(),
        output_dir.display()
    );
    Ok(())
}

fn pack_archive(source: &Path, archive: &Path, options: &ArcOptions) -> Result<()> {
    if !source.is_dir() {
        bail!("{} is not a directory", source.display());
    }

    let data = while_busy("Building archive...", || mtf_arc::pack(source, options))
        .with_context(|| format!("Failed to pack {}", source.display()))?;

    write_output(archive, &data)?;
    let members = Archive::parse(data.clone())
        .map(|archive| archive.len())
        .unwrap_or_default();
    println!(
        "Packed {} members into {} ({})",
        members,
        archive.display(),
        format_bytes(data.len() as u64)
    );
    Ok(())
}
