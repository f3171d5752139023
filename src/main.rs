use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use recast::config::DEFAULT_MODEL;

mod cmd;

#[derive(Parser)]
#[command(name = "recast")]
#[command(version, about = "AI-powered codebase analysis and refactoring agent")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze and refactor a codebase
    Run {
        /// Path to a local codebase folder or a public GitHub repository URL
        path: String,

        /// Directory to save the refactored code into
        #[arg(long, default_value = "refactored_codebase")]
        output_dir: PathBuf,

        /// Model identifier used for all remote calls
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Skip the analysis phase and only perform refactoring
        #[arg(long)]
        skip_analysis: bool,

        /// Skip the refactoring phase and only perform analysis
        #[arg(long)]
        skip_refactoring: bool,

        /// Delay in seconds between remote calls, to respect rate limits
        #[arg(long, default_value = "2")]
        delay: u64,
    },
    /// Serve the HTTP progress/control API
    Serve {
        /// Port to serve on
        #[arg(short, long, default_value = "5000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            path,
            output_dir,
            model,
            skip_analysis,
            skip_refactoring,
            delay,
        } => {
            cmd::cmd_run(path, output_dir, model, skip_analysis, skip_refactoring, delay).await?;
        }
        Commands::Serve { port } => {
            cmd::cmd_serve(port).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "recast=debug" } else { "recast=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
