//! In-memory ZIP packaging of the output root for the download endpoint.

use std::io::{Cursor, Write};
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Package every file under `root` into a ZIP held in memory, with archive
/// paths relative to `root`. Hidden directories are left out.
pub fn zip_dir(root: &Path) -> Result<Vec<u8>> {
    if !root.is_dir() {
        anyhow::bail!("No output directory at '{}'", root.display());
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let walk = WalkDir::new(root).sort_by_file_name().into_iter();
    for entry in walk.filter_entry(|e| e.depth() == 0 || !is_hidden(e)) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .context("Walked entry outside the archive root")?;
        let name = rel.to_string_lossy().replace('\\', "/");
        writer.start_file(name, options)?;
        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        writer.write_all(&bytes)?;
    }

    let cursor = writer.finish().context("Failed to finalize archive")?;
    Ok(cursor.into_inner())
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Timestamped attachment name for a download.
pub fn archive_filename() -> String {
    format!(
        "refactored_codebase_{}.zip",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}
