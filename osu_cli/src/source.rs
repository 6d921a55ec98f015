use std::{fs, path::Path};

use anyhow::{bail, Context};
use osu_loader::ChartFile;
use tracing::info;

/// Collects the chart files of a set: every `.osu` file of a directory (sorted by name), or a
/// single `.osu` file.
pub fn read_chart_files(path: &Path) -> anyhow::Result<Vec<ChartFile>> {
    if path.is_dir() {
        return read_directory(path);
    }

    match extension(path).as_deref() {
        Some("osu") => Ok(vec![read_chart(path)?]),
        Some("osz") => bail!(
            ".osz archives are not supported: {} (extract the set into a directory first)",
            path.display()
        ),
        _ => bail!("not a beatmap directory or .osu file: {}", path.display()),
    }
}

fn read_directory(dir: &Path) -> anyhow::Result<Vec<ChartFile>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory: {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read directory: {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && extension(&path).as_deref() == Some("osu") {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        bail!("no .osu files in {}", dir.display());
    }

    paths.iter().map(|p| read_chart(p)).collect()
}

fn read_chart(path: &Path) -> anyhow::Result<ChartFile> {
    let content = fs::read(path).with_context(|| format!("failed to read: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    info!("Loaded \"{}\" ({} bytes)", name, content.len());
    Ok(ChartFile::new(name, content))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}
