//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;

use anyhow::Result;
use clap::Subcommand;

use jobwatch_client::WatcherConfig;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new job
    Create,
    /// Read the current status of a job
    Status {
        /// Job id
        id: u64,
    },
    /// Wait until a job completes
    Wait {
        /// Job id
        id: u64,
    },
    /// Create several jobs and wait for all of them
    Demo {
        /// Number of jobs to create
        #[arg(long, default_value_t = 3)]
        jobs: usize,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler.
pub async fn handle_command(command: Commands, config: WatcherConfig) -> Result<()> {
    match command {
        Commands::Create => job::create_job(config).await,
        Commands::Status { id } => job::show_status(config, id).await,
        Commands::Wait { id } => job::wait_for_job(config, id).await,
        Commands::Demo { jobs } => job::run_demo(config, jobs).await,
    }
}
