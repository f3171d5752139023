//! Batch orchestration: one run over an accepted file set, from idle to
//! completed or error.

pub mod runner;

pub use runner::{
    AnalysisRecord, BatchRunner, INTERVIEW_QUESTIONS_FILENAME, RECOMMENDATIONS_FILENAME,
    RunOptions, StartError, run_claimed,
};
