//! Tally CLI
//!
//! Command-line entry point for launching and following parsing jobs on the
//! inventory console backend.

mod commands;
mod render;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, handle_command};
use tally_sync::SyncConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Parsing job control for the inventory console", long_about = None)]
struct Cli {
    /// Backend URL
    #[arg(long, env = "TALLY_BACKEND_URL", default_value = "http://localhost:8000")]
    backend_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally_cli=info,tally_sync=info,tally_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.backend_url)?;

    handle_command(cli.command, &config).await
}

/// Combine `TALLY_*` settings with the URL given on the command line
fn load_config(backend_url: String) -> Result<SyncConfig> {
    let mut config = SyncConfig::from_env().context("Failed to read TALLY_* settings")?;
    config.backend_url = backend_url;
    config.validate().context("Invalid configuration")?;

    tracing::debug!(
        backend_url = %config.backend_url,
        poll_interval = ?config.poll_interval,
        launch_policy = %config.launch_policy,
        "Loaded configuration"
    );

    Ok(config)
}
