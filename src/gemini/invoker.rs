//! Retry and backoff policy around a [`TextGenerator`].
//!
//! The invoker never surfaces an error to its caller: every failure path
//! resolves to either usable response text or a synthetic message prefixed
//! with [`ERROR_MARKER`], which downstream code can test for with a plain
//! string check. Rate limiting gets a fixed cooldown (the remote limiter
//! resets on its own schedule, so growing the wait does not help); all other
//! failures get a linear backoff.

use std::time::Duration;

use tokio::time::sleep;

use super::client::{GenerateError, TextGenerator};

/// Prefix of every synthetic failure message produced by the invoker.
pub const ERROR_MARKER: &str = "Error:";

/// Fixed wait after a rate-limit signal, independent of the attempt index.
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Backoff unit for generic transient failures: attempt `k` sleeps `k * 2s`.
const BACKOFF_UNIT: Duration = Duration::from_secs(2);

/// Classified result of one remote call attempt.
#[derive(Debug)]
pub enum CallOutcome {
    Success(String),
    SafetyBlocked,
    RateLimited,
    Transient(String),
    Terminal(String),
}

/// Wraps a generator with bounded retries and failure classification.
pub struct CallInvoker<G> {
    generator: G,
}

impl<G: TextGenerator> CallInvoker<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Issue one attempt and classify what came back.
    async fn attempt(&self, prompt: &str) -> CallOutcome {
        match self.generator.generate(prompt).await {
            Ok(response) if response.safety_blocked => CallOutcome::SafetyBlocked,
            Ok(response) => CallOutcome::Success(response.text),
            Err(err) => classify_error(err),
        }
    }

    /// Call the service with up to `max_attempts` attempts.
    ///
    /// Returns the response text on success, or a synthetic message starting
    /// with [`ERROR_MARKER`] once the attempt budget is exhausted. A
    /// rate-limit retry consumes an attempt slot like any other failure.
    pub async fn invoke(&self, prompt: &str, system_prompt: &str, max_attempts: u32) -> String {
        let combined = format!("{}\n\nUser Request:\n{}", system_prompt, prompt);
        let mut last_error = String::from("no attempts were made");

        for attempt in 1..=max_attempts {
            match self.attempt(&combined).await {
                CallOutcome::Success(text) => return text,
                CallOutcome::SafetyBlocked => {
                    tracing::warn!(attempt, "response blocked by safety filters");
                    if attempt == max_attempts {
                        return format!("{} response blocked by safety filters.", ERROR_MARKER);
                    }
                    last_error = "response blocked by safety filters".to_string();
                }
                CallOutcome::RateLimited => {
                    tracing::warn!(attempt, "rate limit detected, cooling down");
                    last_error = "rate limited by the service".to_string();
                    sleep(RATE_LIMIT_COOLDOWN).await;
                }
                CallOutcome::Transient(detail) | CallOutcome::Terminal(detail) => {
                    tracing::warn!(attempt, error = %detail, "attempt failed");
                    last_error = detail;
                    if attempt < max_attempts {
                        sleep(BACKOFF_UNIT * attempt).await;
                    }
                }
            }
        }

        format!(
            "{} could not get a response from the service after {} attempts. Last error: {}",
            ERROR_MARKER, max_attempts, last_error
        )
    }
}

fn classify_error(err: GenerateError) -> CallOutcome {
    let detail = err.to_string();
    let lower = detail.to_lowercase();
    if lower.contains("quota") || lower.contains("rate") {
        CallOutcome::RateLimited
    } else if err.is_terminal() {
        CallOutcome::Terminal(detail)
    } else {
        CallOutcome::Transient(detail)
    }
}

/// Convenience check for invoker failure sentinels.
pub fn is_error_text(text: &str) -> bool {
    text.starts_with(ERROR_MARKER)
}
