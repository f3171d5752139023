//! Runtime configuration for the agent.
//!
//! Settings are layered: built-in defaults, then a `.env` file (loaded by the
//! binary before `Config::from_env` runs), then process environment variables.
//! Everything except the API key has a sensible default, so a bare
//! `GEMINI_API_KEY=...` is enough to run.

use std::time::Duration;

/// File extensions the walker accepts for processing.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Python
    ".py", ".pyx", ".pyi",
    // JavaScript / TypeScript
    ".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs",
    // Web
    ".html", ".htm", ".css", ".scss", ".sass", ".less",
    // JVM
    ".java", ".scala", ".kt", ".groovy",
    // C / C++
    ".c", ".cpp", ".cxx", ".cc", ".h", ".hpp", ".hxx",
    // .NET
    ".cs", ".vb",
    // Systems
    ".go", ".rs", ".zig",
    // Mobile
    ".swift", ".m", ".mm",
    // Scripting
    ".sh", ".bash", ".zsh", ".fish", ".ps1", ".bat", ".cmd",
    // Data & misc
    ".sql", ".r", ".php", ".rb", ".pl", ".lua", ".dart", ".elm",
];

/// Directory and file names the walker never descends into or reads.
pub const IGNORE_NAMES: &[&str] = &[
    // Version control
    ".git", ".svn", ".hg",
    // Python
    "__pycache__", "venv", "env", ".venv", ".env", ".pytest_cache", ".tox",
    // Node.js
    "node_modules", ".npm",
    // IDEs
    ".idea", ".vscode",
    // Build outputs
    "dist", "build", "out", "target", "bin", "obj",
    // OS noise
    ".DS_Store", "Thumbs.db",
    // Logs and scratch space
    "logs", "tmp", "temp", ".tmp", ".temp",
];

/// Suffix patterns (the `*.ext` entries of the ignore set).
pub const IGNORE_SUFFIXES: &[&str] = &[".pyc", ".pyo", ".pyd", ".log", ".swp", ".swo"];

/// Models offered through the CLI and the `/api/config` endpoint.
pub const KNOWN_MODELS: &[&str] = &["gemini-2.5-flash-lite", "gemini-1.5-flash-8b", "gemini-pro"];

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

pub const ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a senior software engineer specializing in code quality analysis. \
     Analyze the provided code and give a concise, structured report on its quality. \
     Focus on actionable insights and be specific about issues found.";

pub const REFACTORING_SYSTEM_PROMPT: &str =
    "You are an expert code refactoring assistant. Your task is to rewrite the given code to improve \
     its readability, maintainability, and adherence to best practices without altering its core functionality. \
     Add appropriate comments and docstrings. Ensure the code follows language-specific conventions. \
     Return only the refactored code in a markdown code block without explanations.";

pub const RECOMMENDATIONS_SYSTEM_PROMPT: &str =
    "You are a principal software architect. Based on the analysis reports of multiple files from a codebase, \
     provide high-level, actionable recommendations for improving the entire project. \
     Focus on patterns, architectural issues, and strategic improvements.";

pub const INTERVIEW_QUESTIONS_SYSTEM_PROMPT: &str =
    "You are a senior software engineer and technical interviewer. \
     Create insightful technical interview questions based on the codebase analysis. \
     Questions should assess understanding of software design, problem-solving, and coding practices. \
     Make questions specific to the analyzed code but also test general programming knowledge.";

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_attempts: u32,
    pub request_timeout: Duration,
    /// Analysis prompts truncate file content beyond this many characters.
    pub max_analysis_len: usize,
    /// Files larger than this are not sent for refactoring at all.
    pub max_refactor_len: usize,
    /// Aggregate analysis text is truncated to this before synthesis calls.
    pub max_summary_len: usize,
    pub clone_timeout: Duration,
    /// Pause between the analysis and refactor calls for one file.
    pub inter_call_delay: Duration,
    /// Pause after one file finishes before the next begins.
    pub inter_file_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_attempts: 3,
            request_timeout: Duration::from_secs(30),
            max_analysis_len: 12_000,
            max_refactor_len: 15_000,
            max_summary_len: 20_000,
            clone_timeout: Duration::from_secs(60),
            inter_call_delay: Duration::from_secs(2),
            inter_file_delay: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: env_or("GEMINI_MODEL", defaults.model.clone()),
            temperature: env_parsed("GEMINI_TEMPERATURE", defaults.temperature),
            max_attempts: env_parsed("GEMINI_MAX_RETRIES", defaults.max_attempts),
            request_timeout: Duration::from_secs(env_parsed(
                "GEMINI_REQUEST_TIMEOUT",
                defaults.request_timeout.as_secs(),
            )),
            max_analysis_len: env_parsed("MAX_FILE_SIZE_FOR_ANALYSIS", defaults.max_analysis_len),
            max_refactor_len: env_parsed("MAX_FILE_SIZE_FOR_REFACTORING", defaults.max_refactor_len),
            clone_timeout: Duration::from_secs(env_parsed(
                "GIT_CLONE_TIMEOUT",
                defaults.clone_timeout.as_secs(),
            )),
            ..defaults
        }
    }

    /// Replace the model identifier (CLI / API override).
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Check whether a file name has a supported extension.
pub fn is_supported_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Check whether a file or directory name matches the ignore set.
pub fn should_ignore(name: &str) -> bool {
    IGNORE_NAMES.contains(&name) || IGNORE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
