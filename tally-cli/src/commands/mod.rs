//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod catalog;
mod job;

use anyhow::Result;
use clap::Subcommand;
use tally_core::domain::job::SpecialImport;
use tally_sync::SyncConfig;

use crate::types::OptionArg;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List parsing sources
    Sources,
    /// List parsing styles
    Styles,
    /// List parsing modes and their options
    Modes,
    /// Start a parsing job and follow it
    Start {
        /// Source ID
        #[arg(long)]
        source: i64,

        /// Style ID
        #[arg(long)]
        style: i64,

        /// Parsing mode (e.g. full, incremental)
        #[arg(long)]
        mode: Option<String>,

        /// Mode option as name=value, repeatable
        #[arg(short = 'o', long = "option")]
        options: Vec<OptionArg>,

        /// Return once the job is started
        #[arg(long)]
        detach: bool,
    },
    /// Run the orders import
    Orders {
        /// Return once the job is started
        #[arg(long)]
        detach: bool,
    },
    /// Run the Google Sheets import
    Sheets {
        /// Return once the job is started
        #[arg(long)]
        detach: bool,
    },
    /// Follow a job that is already running
    Attach {
        /// Job ID
        id: i64,
    },
    /// Show the current status of a job
    Status {
        /// Job ID
        id: i64,
    },
    /// Ask the backend to stop a job
    Stop {
        /// Job ID
        id: i64,
    },
    /// List recent parsing jobs
    Logs {
        /// Maximum number of jobs to show
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &SyncConfig) -> Result<()> {
    match command {
        Commands::Sources => catalog::list_sources(config).await,
        Commands::Styles => catalog::list_styles(config).await,
        Commands::Modes => catalog::list_modes(config).await,
        Commands::Start {
            source,
            style,
            mode,
            options,
            detach,
        } => job::start(config, source, style, mode, options, detach).await,
        Commands::Orders { detach } => job::special(config, SpecialImport::Orders, detach).await,
        Commands::Sheets { detach } => job::special(config, SpecialImport::GoogleSheets, detach).await,
        Commands::Attach { id } => job::attach(config, id).await,
        Commands::Status { id } => job::status(config, id).await,
        Commands::Stop { id } => job::stop(config, id).await,
        Commands::Logs { limit } => job::logs(config, limit).await,
    }
}
