//! # Fanout CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Broadcast trigger with report stream on stdout (or a file)
//! - Destination listing

mod cli;
mod commands;
mod error;

use anyhow::{Context, Result};
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_broadcast, run_list, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Fanout CLI starting");

    let result = match &cli.command {
        Commands::Broadcast(args) => run_broadcast(args).await,
        Commands::List(args) => run_list(args).await,
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result.context("fanout command failed")
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    observability::init(&ObservabilityConfig {
        log_format: cli.log_format.into(),
        log_target: cli.log_target(),
        default_log_level: cli.log_level().to_string(),
        metrics_port: None,
    })
}
