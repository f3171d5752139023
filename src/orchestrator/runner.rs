//! Batch runner: walks the accepted file set, drives the per-file processor,
//! accumulates analysis reports, and synthesizes the derivative documents
//! once the batch completes.
//!
//! Failure policy follows two rules. A failure to even start (bad source,
//! missing credentials, clone failure) aborts the run and lands in the
//! tracker as `status = error`. Anything that goes wrong while processing a
//! single file is logged, the file is skipped, and the batch continues.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::time::sleep;

use crate::config::{
    Config, INTERVIEW_QUESTIONS_SYSTEM_PROMPT, RECOMMENDATIONS_SYSTEM_PROMPT,
};
use crate::gemini::{CallInvoker, GeminiClient, TextGenerator};
use crate::processor::{FileProcessor, ProcessObserver, ProcessPolicy};
use crate::progress::{LogLevel, ProcessedFile, ProgressTracker};
use crate::repo::{clone_repo, is_github_url};
use crate::walker::{SourceFile, collect_source_files, validate_source_dir};

pub const RECOMMENDATIONS_FILENAME: &str = "CODEBASE_RECOMMENDATIONS.md";
pub const INTERVIEW_QUESTIONS_FILENAME: &str = "INTERVIEW_QUESTIONS.md";

const SUMMARY_TRUNCATION_MARKER: &str = "\n... (analysis truncated due to length)";

/// Reasons a run request is refused before anything starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("A task is already running")]
    AlreadyRunning,

    #[error("Source path is required")]
    MissingSource,

    #[error("Cannot skip both analysis and refactoring")]
    ConflictingFlags,
}

/// Capability flags and locations for one batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Local directory or public GitHub repository URL.
    pub source: String,
    pub output_dir: PathBuf,
    pub model: String,
    pub skip_analysis: bool,
    pub skip_refactoring: bool,
    /// Courtesy pause between the analysis and refactor calls for one file.
    pub delay: Duration,
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), StartError> {
        if self.source.trim().is_empty() {
            return Err(StartError::MissingSource);
        }
        if self.skip_analysis && self.skip_refactoring {
            return Err(StartError::ConflictingFlags);
        }
        Ok(())
    }
}

/// One file's analysis report, in processing order.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub path: String,
    pub report: String,
}

/// Drive a claimed run to its terminal state.
///
/// The caller must have claimed the tracker with
/// [`ProgressTracker::begin_run`] already; this function only ever leaves it
/// in `completed` or `error`, never `running`.
pub async fn run_claimed(
    config: Config,
    progress: ProgressTracker,
    options: RunOptions,
    observer: &dyn ProcessObserver,
) {
    match prepare_and_run(&config, &progress, &options, observer).await {
        Ok(()) => {
            progress.append_log("Processing complete!", LogLevel::Success);
            progress.complete();
        }
        Err(err) => {
            let message = format!("{err:#}");
            tracing::error!(error = %message, "batch run failed");
            progress.append_log(format!("Error: {message}"), LogLevel::Error);
            progress.fail(&message);
        }
    }
}

/// Resolve the source, build the remote client, and run the batch.
async fn prepare_and_run(
    config: &Config,
    progress: &ProgressTracker,
    options: &RunOptions,
    observer: &dyn ProcessObserver,
) -> Result<()> {
    let api_key = config
        .api_key
        .clone()
        .context("GEMINI_API_KEY not found. Set it in your environment or .env file")?;

    progress.append_log("Starting codebase processing...", LogLevel::Info);

    // Keep a cloned repository alive for the duration of the run; dropping
    // the guard removes the checkout.
    let mut clone_guard = None;
    let source_dir = if is_github_url(&options.source) {
        progress.append_log(
            format!("Cloning repository: {}", options.source),
            LogLevel::Info,
        );
        let checkout = clone_repo(&options.source, config.clone_timeout).await?;
        let path = checkout.path().to_path_buf();
        clone_guard = Some(checkout);
        progress.append_log("Repository cloned successfully", LogLevel::Success);
        path
    } else {
        PathBuf::from(&options.source)
    };

    validate_source_dir(&source_dir)?;

    progress.append_log(format!("Source: {}", source_dir.display()), LogLevel::Info);
    progress.append_log(
        format!("Output: {}", options.output_dir.display()),
        LogLevel::Info,
    );
    progress.append_log(format!("Model: {}", options.model), LogLevel::Info);

    if options.output_dir.exists() {
        progress.append_log("Cleaning output directory", LogLevel::Info);
        std::fs::remove_dir_all(&options.output_dir)
            .with_context(|| format!("Failed to remove {}", options.output_dir.display()))?;
    }
    std::fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("Failed to create {}", options.output_dir.display()))?;

    let files = collect_source_files(&source_dir)?;

    let run_config = config.clone().with_model(&options.model);
    let client = GeminiClient::new(api_key, &run_config)?;
    let runner = BatchRunner::new(CallInvoker::new(client), run_config, progress.clone());
    let result = runner.run(options, files, observer).await;

    drop(clone_guard);
    result
}

/// Sequential orchestrator for one batch run.
///
/// State machine per run: `Idle → Running → {Completed, Error}`; a second run
/// request while `Running` is refused at the tracker, not queued. Remote
/// calls are strictly sequential, one dedicated task per run.
pub struct BatchRunner<G> {
    invoker: CallInvoker<G>,
    config: Config,
    progress: ProgressTracker,
}

impl<G: TextGenerator> BatchRunner<G> {
    pub fn new(invoker: CallInvoker<G>, config: Config, progress: ProgressTracker) -> Self {
        Self {
            invoker,
            config,
            progress,
        }
    }

    /// Process every accepted file, then synthesize the derivative documents.
    pub async fn run(
        &self,
        options: &RunOptions,
        files: Vec<SourceFile>,
        observer: &dyn ProcessObserver,
    ) -> Result<()> {
        let total = files.len();
        if total == 0 {
            self.progress.append_log(
                "No supported code files found for processing",
                LogLevel::Warning,
            );
            return Ok(());
        }

        observer.batch_started(total);

        let policy = ProcessPolicy {
            skip_analysis: options.skip_analysis,
            skip_refactoring: options.skip_refactoring,
            inter_call_delay: options.delay,
        };
        let processor = FileProcessor::new(
            &self.invoker,
            &self.config,
            &options.output_dir,
            policy,
            observer,
        );

        let mut records: Vec<AnalysisRecord> = Vec::new();

        for (index, file) in files.iter().enumerate() {
            let rel = file.rel_path_str();
            self.progress.update(|s| s.current_file = rel.clone());
            self.progress
                .append_log(format!("Processing: {rel}"), LogLevel::Info);

            match processor.process(file).await {
                Ok(outcome) => {
                    let refactored = outcome.written_to.is_some();
                    if let Some(report) = outcome.analysis {
                        records.push(AnalysisRecord {
                            path: rel.clone(),
                            report,
                        });
                    }
                    let descriptor = ProcessedFile {
                        name: file
                            .rel_path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| rel.clone()),
                        path: rel.clone(),
                    };
                    self.progress.update(|s| {
                        if !options.skip_analysis {
                            s.files_analyzed += 1;
                        }
                        if refactored {
                            s.files_refactored += 1;
                        } else {
                            s.files_skipped += 1;
                        }
                        s.processed_files.push(descriptor);
                    });
                }
                Err(err) => {
                    tracing::error!(path = %rel, error = %format!("{err:#}"), "error processing file");
                    self.progress.append_log(
                        format!("Error processing {rel}: {err:#}"),
                        LogLevel::Error,
                    );
                    self.progress.update(|s| s.files_skipped += 1);
                }
            }

            self.progress.update(|s| {
                s.files_processed += 1;
                s.progress = (((index + 1) * 100) / total) as u8;
            });
            observer.file_finished(&rel);

            if index + 1 < total {
                sleep(self.config.inter_file_delay).await;
            }
        }

        if !records.is_empty() {
            self.synthesize(&records, options).await?;
        }

        Ok(())
    }

    /// Produce the two derivative documents from the accumulated reports.
    async fn synthesize(&self, records: &[AnalysisRecord], options: &RunOptions) -> Result<()> {
        let summary = combined_reports(records, self.config.max_summary_len);

        self.progress
            .append_log("Generating overall recommendations...", LogLevel::Info);
        let recommendations_prompt = format!(
            "Here are the analysis reports for several files in a codebase:\n\
             ---\n{summary}\n---\n\
             Based on these reports, please provide a high-level summary and actionable recommendations for the entire project.\n\
             Focus on patterns you observe (e.g., inconsistent styling, lack of documentation, high complexity in multiple modules).\n\
             Structure your response with:\n\
             1. **Overall Summary:** A brief paragraph about the general state of the codebase.\n\
             2. **Key Recommendations:** A bulleted list of the top 3-5 most impactful recommendations.",
        );
        let recommendations = self
            .invoker
            .invoke(
                &recommendations_prompt,
                RECOMMENDATIONS_SYSTEM_PROMPT,
                self.config.max_attempts,
            )
            .await;
        self.write_document(
            options,
            RECOMMENDATIONS_FILENAME,
            "Codebase Recommendations",
            &recommendations,
        )?;
        self.progress
            .update(|s| s.recommendations = Some(recommendations));

        self.progress
            .append_log("Generating interview questions...", LogLevel::Info);
        let questions_prompt = format!(
            "Here are analysis reports for several files from a candidate's codebase:\n\
             ---\n{summary}\n---\n\
             Based on these reports, generate a set of 5-7 interview questions. The questions should be:\n\
             1. **Conceptual:** Ask about the architectural choices, design patterns, or high-level decisions.\n\
             2. **Code-Specific:** Refer to potential issues (like high complexity or code smells) and ask how the candidate would justify or improve them.\n\
             3. **Refactoring-Oriented:** Propose a hypothetical new requirement and ask how they would adapt the existing code.\n\n\
             Format the output clearly with headings for each question.",
        );
        let questions = self
            .invoker
            .invoke(
                &questions_prompt,
                INTERVIEW_QUESTIONS_SYSTEM_PROMPT,
                self.config.max_attempts,
            )
            .await;
        self.write_document(
            options,
            INTERVIEW_QUESTIONS_FILENAME,
            "Interview Questions",
            &questions,
        )?;
        self.progress
            .update(|s| s.interview_questions = Some(questions));

        Ok(())
    }

    fn write_document(
        &self,
        options: &RunOptions,
        filename: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        let path = options.output_dir.join(filename);
        std::fs::write(&path, format!("# {title}\n\n{body}"))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.progress
            .append_log(format!("Saved {filename}"), LogLevel::Success);
        Ok(())
    }
}

/// Concatenate the per-file reports, bounded by the aggregate character
/// budget for synthesis prompts.
fn combined_reports(records: &[AnalysisRecord], max_len: usize) -> String {
    let combined = records
        .iter()
        .map(|record| format!("File: {}\n{}\n", record.path, record.report))
        .collect::<Vec<_>>()
        .join("\n");
    if combined.len() > max_len {
        let cut = combined.floor_char_boundary(max_len);
        format!("{}{}", &combined[..cut], SUMMARY_TRUNCATION_MARKER)
    } else {
        combined
    }
}
