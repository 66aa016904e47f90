//! Format-agnostic commands dispatched through the registry

use std::path::Path;

use anyhow::{Context, Result, anyhow};

use super::{output_path, read_input, write_output};
use crate::registry::FormatRegistry;
use crate::utils::{format_bytes, properties};

fn unknown_format(path: &Path, data: &[u8], registry: &FormatRegistry) -> anyhow::Error {
    let magic = String::from_utf8_lossy(&data[..data.len().min(4)]).into_owned();
    let known: Vec<String> = registry
        .formats()
        .map(|(magic, _)| String::from_utf8_lossy(&magic).trim_end_matches('\0').to_owned())
        .collect();
    anyhow!(
        "{} has an unrecognised magic {:?} (known: {})",
        path.display(),
        magic,
        known.join(", ")
    )
}

/// Identify `path` by magic and print its summary.
pub fn describe_file(registry: &FormatRegistry, path: &Path) -> Result<()> {
    let data = read_input(path)?;
    let handler = registry
        .detect(&data)
        .ok_or_else(|| unknown_format(path, &data, registry))?;
    log::info!("{} detected as {}", path.display(), handler.name());

    let size = data.len() as u64;
    let mut rows = vec![
        ("Format".to_owned(), handler.name().to_owned()),
        ("File size".to_owned(), format_bytes(size)),
    ];
    rows.extend(
        handler
            .describe(data)
            .with_context(|| format!("Failed to read {} as {}", path.display(), handler.name()))?,
    );
    if let Some(extension) = handler.converts_to() {
        rows.push(("Converts to".to_owned(), extension.to_owned()));
    }

    println!("=== {} ===", path.display());
    properties(&rows).printstd();
    Ok(())
}

/// Convert `input` to the counterpart format of whatever it turns out to be.
pub fn convert_file(registry: &FormatRegistry, input: &Path, output: Option<&Path>) -> Result<()> {
    let data = read_input(input)?;
    let handler = registry
        .detect(&data)
        .ok_or_else(|| unknown_format(input, &data, registry))?;
    let extension = handler
        .converts_to()
        .ok_or_else(|| anyhow!("{} files have no conversion", handler.name()))?;

    let converted = handler
        .convert(data)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    let target = output_path(input, output, extension);
    write_output(&target, &converted)?;
    println!("Wrote {}", target.display());
    Ok(())
}
