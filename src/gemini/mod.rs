//! Remote text-generation service integration.
//!
//! `client` owns the wire protocol (Gemini `generateContent` REST API behind
//! the [`TextGenerator`] trait); `invoker` owns the failure policy (retries,
//! backoff, rate-limit cooldown) layered on top of any generator.

pub mod client;
pub mod invoker;

pub use client::{GeminiClient, GenerateError, GenerateResponse, TextGenerator};
pub use invoker::{CallInvoker, CallOutcome, ERROR_MARKER, is_error_text};
