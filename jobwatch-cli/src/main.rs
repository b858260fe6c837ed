//! Jobwatch CLI
//!
//! Command-line harness for the jobwatch client: create jobs on a running
//! job service and track their completion over the configured transport.

mod commands;
mod types;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{Commands, handle_command};
use jobwatch_client::WatcherConfig;
use types::ModeArg;

#[derive(Parser)]
#[command(name = "jobwatch")]
#[command(about = "Track remote job completion over push or poll transports", long_about = None)]
struct Cli {
    /// Job service URL
    #[arg(long, env = "JOBWATCH_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Transport mode
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    mode: ModeArg,

    /// Fall back to polling if the status stream fails
    #[arg(long)]
    fallback: bool,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobwatch_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = WatcherConfig::new(cli.url)
        .with_mode(cli.mode.into())
        .with_fallback(cli.fallback)
        .with_poll_interval(Duration::from_millis(cli.poll_interval_ms));

    handle_command(cli.command, config).await
}
