//! File supplier: walks a source tree and yields the accepted files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::config::{is_supported_file, should_ignore};

/// One accepted input file, addressed by its path relative to the source root.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub rel_path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn rel_path_str(&self) -> String {
        self.rel_path.to_string_lossy().to_string()
    }
}

/// Walk `root` and collect every supported, non-ignored, non-empty file.
///
/// Content is read lossily: files with invalid UTF-8 sequences are kept with
/// replacement characters rather than dropped. Entries are returned in a
/// stable sorted order so runs over the same tree are deterministic.
pub fn collect_source_files(root: &Path) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();

    let walk = WalkDir::new(root).sort_by_file_name().into_iter();
    for entry in walk.filter_entry(|e| !entry_ignored(e.file_name())) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_supported_file(&name) {
            continue;
        }

        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        let content = String::from_utf8_lossy(&bytes).to_string();
        if content.trim().is_empty() {
            tracing::debug!(path = %entry.path().display(), "skipping empty file");
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        files.push(SourceFile { rel_path, content });
    }

    Ok(files)
}

fn entry_ignored(name: &std::ffi::OsStr) -> bool {
    should_ignore(&name.to_string_lossy())
}

/// Validate that `path` exists, is a directory, and contains at least one file.
pub fn validate_source_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Source path '{}' does not exist", path.display());
    }
    if !path.is_dir() {
        anyhow::bail!("'{}' is not a directory", path.display());
    }
    let has_files = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file());
    if !has_files {
        anyhow::bail!("Directory '{}' is empty", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_collects_supported_files_with_relative_paths() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.py"), "print('hi')").unwrap();
        fs::write(dir.path().join("notes.md"), "# notes").unwrap();

        let files = collect_source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel_path, Path::new("src/main.py"));
        assert_eq!(files[0].content, "print('hi')");
    }

    #[test]
    fn test_skips_ignored_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config.py"), "x").unwrap();
        fs::write(dir.path().join("app.js"), "let a = 1;").unwrap();

        let files = collect_source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel_path, Path::new("app.js"));
    }

    #[test]
    fn test_skips_empty_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.py"), "   \n\n").unwrap();
        fs::write(dir.path().join("real.py"), "x = 1").unwrap();

        let files = collect_source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel_path, Path::new("real.py"));
    }

    #[test]
    fn test_order_is_deterministic() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.py"), "b").unwrap();
        fs::write(dir.path().join("a.py"), "a").unwrap();
        fs::write(dir.path().join("c.py"), "c").unwrap();

        let names: Vec<String> = collect_source_files(dir.path())
            .unwrap()
            .iter()
            .map(|f| f.rel_path_str())
            .collect();
        assert_eq!(names, vec!["a.py", "b.py", "c.py"]);
    }

    #[test]
    fn test_validate_source_dir_missing() {
        let result = validate_source_dir(Path::new("/nonexistent/source"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_validate_source_dir_not_a_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let result = validate_source_dir(&file);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_validate_source_dir_empty() {
        let dir = tempdir().unwrap();
        let result = validate_source_dir(dir.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_source_dir_ok() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("anything.txt"), "x").unwrap();
        assert!(validate_source_dir(dir.path()).is_ok());
    }
}
