//! Shallow-clone shim for processing public GitHub repositories.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::process::Command;

/// Check whether `path` looks like a public GitHub repository URL.
/// Both `.git` and bare `https://github.com/owner/repo` forms are accepted.
pub fn is_github_url(path: &str) -> bool {
    path.starts_with("https://github.com/")
        && (path.ends_with(".git") || path.split('/').count() >= 5)
}

/// Clone `url` (depth 1) into a temporary directory.
///
/// The returned [`TempDir`] owns the checkout; dropping it removes the clone.
pub async fn clone_repo(url: &str, timeout: Duration) -> Result<TempDir> {
    let temp_dir = tempfile::Builder::new()
        .prefix("recast_repo_")
        .tempdir()
        .context("Failed to create temporary clone directory")?;

    let mut clone_url = url.to_string();
    if !clone_url.ends_with(".git") {
        clone_url.push_str(".git");
    }

    tracing::info!(url = %clone_url, dest = %temp_dir.path().display(), "cloning repository");

    let output = tokio::time::timeout(
        timeout,
        Command::new("git")
            .args(["clone", "--depth", "1", &clone_url])
            .arg(temp_dir.path())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .context("Repository cloning timed out")?
    .context("Failed to run git. Is it installed and in your PATH?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Failed to clone repository: {}", stderr.trim());
    }

    Ok(temp_dir)
}
