//! One-shot batch processing — `recast run <path>`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use console::style;

use recast::config::Config;
use recast::orchestrator::{RunOptions, run_claimed};
use recast::progress::{ProgressTracker, RunStatus};
use recast::ui::RunUi;

pub async fn cmd_run(
    path: String,
    output_dir: PathBuf,
    model: String,
    skip_analysis: bool,
    skip_refactoring: bool,
    delay: u64,
) -> Result<()> {
    let config = Config::from_env();
    if !config.api_key_configured() {
        anyhow::bail!(
            "GEMINI_API_KEY not found. Set it in your environment or .env file.\n\
             Get an API key from https://aistudio.google.com/app/apikey"
        );
    }

    let options = RunOptions {
        source: path,
        output_dir,
        model,
        skip_analysis,
        skip_refactoring,
        delay: Duration::from_secs(delay),
    };
    options.validate()?;

    println!(
        "{} model: {}, delay: {}s",
        style("recast").bold(),
        style(&options.model).cyan(),
        delay
    );

    let progress = ProgressTracker::new();
    if !progress.begin_run(&options.output_dir) {
        anyhow::bail!("A task is already running");
    }

    let ui = RunUi::new();
    run_claimed(config, progress.clone(), options.clone(), &ui).await;
    ui.finish();

    let state = progress.snapshot();
    match state.status {
        RunStatus::Completed => {
            println!(
                "{} {} file(s) processed, {} refactored, {} skipped",
                style("Done:").green().bold(),
                state.files_processed,
                state.files_refactored,
                state.files_skipped,
            );
            if state.files_processed > 0 {
                println!("Output saved to {}", style(options.output_dir.display()).cyan());
            }
            Ok(())
        }
        _ => {
            let message = state
                .error
                .unwrap_or_else(|| "run ended in an unexpected state".to_string());
            anyhow::bail!("{}", message);
        }
    }
}
