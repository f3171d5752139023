//! HTTP API server — `recast serve`.

use anyhow::Result;
use console::style;

use recast::config::Config;
use recast::server::start_server;

pub async fn cmd_serve(port: u16) -> Result<()> {
    let config = Config::from_env();
    if !config.api_key_configured() {
        eprintln!(
            "{} GEMINI_API_KEY is not set; runs will fail until it is configured",
            style("warning:").yellow().bold()
        );
    }
    start_server(config, port).await
}
