//! Shared progress record for one batch run.
//!
//! The orchestrator is the only writer; the HTTP status endpoint (and anything
//! else observing a run) reads through [`ProgressTracker::snapshot`], which
//! returns a defensive copy so readers never alias a record mid-update.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Lifecycle of a batch run. Transitions only move forward within one run:
/// `Idle → Running → {Completed, Error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub name: String,
    pub path: String,
}

/// Point-in-time view of a batch run, serialized as-is by the status endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressState {
    pub active: bool,
    pub progress: u8,
    pub files_processed: u32,
    pub files_analyzed: u32,
    pub files_refactored: u32,
    pub files_skipped: u32,
    pub current_file: String,
    pub status: RunStatus,
    pub logs: Vec<LogEntry>,
    pub error: Option<String>,
    pub recommendations: Option<String>,
    pub interview_questions: Option<String>,
    pub processed_files: Vec<ProcessedFile>,
    /// Where the current run writes its artifacts; not part of the wire shape.
    #[serde(skip)]
    pub output_dir: Option<PathBuf>,
}

/// Single-writer, multiple-reader handle on a [`ProgressState`].
#[derive(Clone, Default)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressState>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ProgressState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset to initial values, as at the start of a run.
    pub fn reset(&self) {
        *self.guard() = ProgressState::default();
    }

    /// Atomically claim the tracker for a new run.
    ///
    /// Returns `false` without touching any state when a run is already in
    /// flight; otherwise resets the record, marks it running, and records the
    /// output root for the download endpoint.
    pub fn begin_run(&self, output_dir: &Path) -> bool {
        let mut state = self.guard();
        if state.active || state.status == RunStatus::Running {
            return false;
        }
        *state = ProgressState {
            active: true,
            status: RunStatus::Running,
            output_dir: Some(output_dir.to_path_buf()),
            ..ProgressState::default()
        };
        true
    }

    /// Apply a mutation to the live record. Writer-side only.
    pub fn update(&self, patch: impl FnOnce(&mut ProgressState)) {
        patch(&mut self.guard());
    }

    /// Read a point-in-time copy, uncorrelated with later writes.
    pub fn snapshot(&self) -> ProgressState {
        self.guard().clone()
    }

    pub fn append_log(&self, message: impl Into<String>, level: LogLevel) {
        let entry = LogEntry {
            message: message.into(),
            level,
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        };
        self.guard().logs.push(entry);
    }

    /// Terminal transition for a successful run.
    pub fn complete(&self) {
        let mut state = self.guard();
        state.status = RunStatus::Completed;
        state.progress = 100;
        state.active = false;
    }

    /// Terminal transition for a failed run.
    pub fn fail(&self, error: &str) {
        let mut state = self.guard();
        state.status = RunStatus::Error;
        state.error = Some(error.to_string());
        state.active = false;
    }
}
