//! Per-file task runner: analyze, refactor, persist.
//!
//! The core safety property lives here: a remote-call or extraction failure
//! never discards or corrupts original content. The worst case for any file is
//! that its "refactored" output equals its input.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;

use crate::config::{ANALYSIS_SYSTEM_PROMPT, Config, REFACTORING_SYSTEM_PROMPT};
use crate::extract::extract_code_block;
use crate::gemini::{CallInvoker, TextGenerator, is_error_text};
use crate::walker::SourceFile;

const ANALYSIS_TRUNCATION_MARKER: &str = "\n... (file truncated for analysis)";

/// Instrumentation hook threaded through the runner's constructor.
///
/// Implementations must be cheap and non-blocking; they are called inline from
/// the processing sequence. All methods default to no-ops.
pub trait ProcessObserver: Send + Sync {
    fn batch_started(&self, _total_files: usize) {}
    fn analysis_started(&self, _path: &str) {}
    fn file_analyzed(&self, _path: &str) {}
    fn refactor_started(&self, _path: &str) {}
    fn file_refactored(&self, _path: &str) {}
    fn file_finished(&self, _path: &str) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl ProcessObserver for NoopObserver {}

/// Which phases run for each file, and the courtesy pause between them.
#[derive(Debug, Clone)]
pub struct ProcessPolicy {
    pub skip_analysis: bool,
    pub skip_refactoring: bool,
    pub inter_call_delay: Duration,
}

/// What one file produced.
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub analysis: Option<String>,
    pub written_to: Option<PathBuf>,
}

/// Sequences analyze → refactor → persist for one file at a time.
pub struct FileProcessor<'a, G> {
    invoker: &'a CallInvoker<G>,
    config: &'a Config,
    output_root: &'a Path,
    policy: ProcessPolicy,
    observer: &'a dyn ProcessObserver,
}

impl<'a, G: TextGenerator> FileProcessor<'a, G> {
    pub fn new(
        invoker: &'a CallInvoker<G>,
        config: &'a Config,
        output_root: &'a Path,
        policy: ProcessPolicy,
        observer: &'a dyn ProcessObserver,
    ) -> Self {
        Self {
            invoker,
            config,
            output_root,
            policy,
            observer,
        }
    }

    /// Run the enabled phases for one file.
    pub async fn process(&self, file: &SourceFile) -> Result<ProcessOutcome> {
        let rel = file.rel_path_str();
        let mut outcome = ProcessOutcome::default();

        if !self.policy.skip_analysis {
            outcome.analysis = Some(self.analyze(&rel, &file.content).await);
            sleep(self.policy.inter_call_delay).await;
        }

        if !self.policy.skip_refactoring {
            let refactored = self.refactor(&rel, &file.content).await;
            outcome.written_to = Some(self.persist(&file.rel_path, &refactored)?);
        }

        Ok(outcome)
    }

    /// Analyze one file, truncating oversized content to stay under request
    /// size limits. The call is always attempted regardless of size.
    pub async fn analyze(&self, rel_path: &str, content: &str) -> String {
        self.observer.analysis_started(rel_path);

        let mut content = content;
        let truncated;
        if content.len() > self.config.max_analysis_len {
            let cut = content.floor_char_boundary(self.config.max_analysis_len);
            truncated = format!("{}{}", &content[..cut], ANALYSIS_TRUNCATION_MARKER);
            content = &truncated;
        }

        let prompt = format!(
            "Analyze the following code from the file '{rel_path}':\n\n\
             ```\n{content}\n```\n\n\
             Provide the following metrics and analysis:\n\
             1. **Code Complexity:** Give a qualitative assessment (e.g., Low, Medium, High) and explain why.\n\
             2. **Maintainability:** Score it from 1-10 (1=very difficult, 10=very easy) and justify your score.\n\
             3. **Code Smells:** List up to 3 major code smells you identify (e.g., long method, duplicate code, large class).\n\
             4. **Brief Summary:** A one-sentence summary of the code's purpose and quality.",
        );

        let analysis = self
            .invoker
            .invoke(&prompt, ANALYSIS_SYSTEM_PROMPT, self.config.max_attempts)
            .await;
        self.observer.file_analyzed(rel_path);
        analysis
    }

    /// Refactor one file, falling back to the original content whenever the
    /// remote call or extraction does not yield usable code. Files above the
    /// refactor ceiling are passed through unchanged without a remote call.
    pub async fn refactor(&self, rel_path: &str, content: &str) -> String {
        self.observer.refactor_started(rel_path);

        if content.len() > self.config.max_refactor_len {
            tracing::warn!(path = rel_path, "file too large for refactoring, copying original");
            self.observer.file_refactored(rel_path);
            return content.to_string();
        }

        let prompt = format!(
            "Refactor the following code from the file '{rel_path}'.\n\
             Return ONLY the complete, refactored code inside a single markdown code block. \
             Do not add any explanations before or after the code block.\n\n\
             Original Code:\n```\n{content}\n```",
        );

        let response = self
            .invoker
            .invoke(&prompt, REFACTORING_SYSTEM_PROMPT, self.config.max_attempts)
            .await;
        let extracted = extract_code_block(&response);

        let result = if extracted.is_empty() || is_error_text(&extracted) {
            tracing::warn!(path = rel_path, "refactoring failed, using original code");
            content.to_string()
        } else {
            extracted
        };
        self.observer.file_refactored(rel_path);
        result
    }

    /// Write `content` to the mirrored path under the output root.
    pub fn persist(&self, rel_path: &Path, content: &str) -> Result<PathBuf> {
        let target = self.output_root.join(rel_path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use tempfile::tempdir;

    use super::*;
    use crate::gemini::{GenerateError, GenerateResponse};

    /// Generator that always answers with the same text.
    struct FixedGenerator {
        response: String,
        calls: AtomicU32,
        last_prompt: Mutex<String>,
    }

    impl FixedGenerator {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: AtomicU32::new(0),
                last_prompt: Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, prompt: &str) -> Result<GenerateResponse, GenerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            Ok(GenerateResponse {
                text: self.response.clone(),
                safety_blocked: false,
            })
        }
    }

    /// Generator that always fails with a server error.
    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<GenerateResponse, GenerateError> {
            Err(GenerateError::Api {
                status: 500,
                message: "boom".to_string(),
            })
        }
    }

    fn policy() -> ProcessPolicy {
        ProcessPolicy {
            skip_analysis: false,
            skip_refactoring: false,
            inter_call_delay: Duration::ZERO,
        }
    }

    fn test_config() -> Config {
        Config::default()
    }

    #[tokio::test]
    async fn test_refactor_extracts_fenced_code() {
        let invoker = CallInvoker::new(FixedGenerator::new("```python\nx = 2\n```"));
        let config = test_config();
        let out = tempdir().unwrap();
        let processor = FileProcessor::new(&invoker, &config, out.path(), policy(), &NoopObserver);

        let result = processor.refactor("a.py", "x=2").await;
        assert_eq!(result, "x = 2");
    }

    #[tokio::test]
    async fn test_refactor_oversized_file_skips_remote_call() {
        let generator = FixedGenerator::new("should never be called");
        let invoker = CallInvoker::new(generator);
        let config = test_config();
        let out = tempdir().unwrap();
        let processor = FileProcessor::new(&invoker, &config, out.path(), policy(), &NoopObserver);

        let big = "x".repeat(config.max_refactor_len + 1);
        let result = processor.refactor("big.py", &big).await;
        assert_eq!(result, big, "oversized output must equal the input");
        assert_eq!(invoker_calls(&processor), 0);
    }

    fn invoker_calls(processor: &FileProcessor<'_, FixedGenerator>) -> u32 {
        processor.invoker.generator().calls.load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn test_refactor_falls_back_to_original_on_failure() {
        let invoker = CallInvoker::new(FailingGenerator);
        let config = test_config();
        let out = tempdir().unwrap();
        let processor = FileProcessor::new(&invoker, &config, out.path(), policy(), &NoopObserver);

        let result = processor.refactor("a.py", "original contents").await;
        assert_eq!(result, "original contents");
    }

    #[tokio::test]
    async fn test_refactor_falls_back_on_empty_extraction() {
        let invoker = CallInvoker::new(FixedGenerator::new(""));
        let config = test_config();
        let out = tempdir().unwrap();
        let processor = FileProcessor::new(&invoker, &config, out.path(), policy(), &NoopObserver);

        let result = processor.refactor("a.py", "keep me").await;
        assert_eq!(result, "keep me");
    }

    #[tokio::test]
    async fn test_refactor_never_returns_empty_for_nonempty_content() {
        for response in ["", "```\n\n```", "Error: blocked"] {
            let invoker = CallInvoker::new(FixedGenerator::new(response));
            let config = test_config();
            let out = tempdir().unwrap();
            let processor =
                FileProcessor::new(&invoker, &config, out.path(), policy(), &NoopObserver);
            let result = processor.refactor("a.py", "content").await;
            assert!(!result.is_empty(), "response {:?} produced empty output", response);
        }
    }

    #[tokio::test]
    async fn test_analyze_truncates_oversized_content() {
        let invoker = CallInvoker::new(FixedGenerator::new("report"));
        let config = test_config();
        let out = tempdir().unwrap();
        let processor = FileProcessor::new(&invoker, &config, out.path(), policy(), &NoopObserver);

        let big = "y".repeat(config.max_analysis_len + 500);
        let result = processor.analyze("big.py", &big).await;
        assert_eq!(result, "report");

        let prompt = processor.invoker.generator().last_prompt.lock().unwrap().clone();
        assert!(prompt.contains(ANALYSIS_TRUNCATION_MARKER));
        assert!(!prompt.contains(&big), "full content must not be sent");
    }

    #[tokio::test]
    async fn test_persist_creates_mirrored_path() {
        let invoker = CallInvoker::new(FixedGenerator::new(""));
        let config = test_config();
        let out = tempdir().unwrap();
        let processor = FileProcessor::new(&invoker, &config, out.path(), policy(), &NoopObserver);

        let written = processor
            .persist(Path::new("nested/dir/mod.rs"), "fn f() {}")
            .unwrap();
        assert_eq!(written, out.path().join("nested/dir/mod.rs"));
        assert_eq!(std::fs::read_to_string(written).unwrap(), "fn f() {}");
    }

    #[tokio::test]
    async fn test_process_runs_both_phases() {
        let invoker = CallInvoker::new(FixedGenerator::new("```\ndone\n```"));
        let config = test_config();
        let out = tempdir().unwrap();
        let processor = FileProcessor::new(&invoker, &config, out.path(), policy(), &NoopObserver);

        let file = SourceFile {
            rel_path: PathBuf::from("a.py"),
            content: "x = 1".to_string(),
        };
        let outcome = processor.process(&file).await.unwrap();
        assert!(outcome.analysis.is_some());
        let written = outcome.written_to.unwrap();
        assert_eq!(std::fs::read_to_string(written).unwrap(), "done");
    }

    #[tokio::test]
    async fn test_process_skip_analysis_leaves_no_report() {
        let invoker = CallInvoker::new(FixedGenerator::new("```\ndone\n```"));
        let config = test_config();
        let out = tempdir().unwrap();
        let mut p = policy();
        p.skip_analysis = true;
        let processor = FileProcessor::new(&invoker, &config, out.path(), p, &NoopObserver);

        let file = SourceFile {
            rel_path: PathBuf::from("a.py"),
            content: "x = 1".to_string(),
        };
        let outcome = processor.process(&file).await.unwrap();
        assert!(outcome.analysis.is_none());
        assert!(outcome.written_to.is_some());
    }

    #[tokio::test]
    async fn test_process_skip_refactoring_writes_nothing() {
        let invoker = CallInvoker::new(FixedGenerator::new("analysis"));
        let config = test_config();
        let out = tempdir().unwrap();
        let mut p = policy();
        p.skip_refactoring = true;
        let processor = FileProcessor::new(&invoker, &config, out.path(), p, &NoopObserver);

        let file = SourceFile {
            rel_path: PathBuf::from("a.py"),
            content: "x = 1".to_string(),
        };
        let outcome = processor.process(&file).await.unwrap();
        assert_eq!(outcome.analysis.as_deref(), Some("analysis"));
        assert!(outcome.written_to.is_none());
        assert!(!out.path().join("a.py").exists());
    }
}
