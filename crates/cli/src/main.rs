//! # Phantom LiDAR CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Bench2Drive download and validation
//! - Phantom-augmented LiDAR recording and plain scene replay
//! - LAZ to OBJ conversion
//! - Graceful shutdown handling

mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use args::{Cli, Commands};
use commands::{run_convert, run_download, run_record, run_replay};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(
        ObservabilityConfig::from_verbosity(cli.verbose, cli.quiet)
            .with_log_format(cli.log_format.into())
            .with_metrics_port(cli.metrics_port),
    )?;

    info!(version = env!("CARGO_PKG_VERSION"), "Phantom LiDAR starting");

    let result = match &cli.command {
        Commands::Download(args) => run_download(args).await,
        Commands::Record(args) => run_record(args).await,
        Commands::Replay(args) => run_replay(args).await,
        Commands::Convert(args) => run_convert(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = format!("{e:#}"), "Command failed");
    }

    result
}
