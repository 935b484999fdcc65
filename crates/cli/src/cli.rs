//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Fanout - broadcast one message to every destination with a live session
#[derive(Parser, Debug)]
#[command(
    name = "fanout",
    author,
    version,
    about = "Broadcast fan-out dispatcher",
    long_about = "Delivers one text payload to every destination in a session store.\n\n\
                  Destinations are discovered lazily, delivered on a bounded worker \n\
                  pool, and reported as a running progress stream plus a final summary."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FANOUT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all logs except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "FANOUT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, env = "FANOUT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level derived from -v / -q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Where diagnostics go, never the report stream
    pub fn log_target(&self) -> observability::LogTarget {
        match &self.log_file {
            Some(path) => observability::LogTarget::File(path.clone()),
            None => observability::LogTarget::Stderr,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Broadcast a message to every valid destination
    Broadcast(BroadcastArgs),

    /// List destinations that currently have a usable session
    List(ListArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `broadcast` command
#[derive(Parser, Debug, Clone)]
pub struct BroadcastArgs {
    /// Text delivered to every destination
    #[arg(short, long, env = "FANOUT_TEXT")]
    pub text: Option<String>,

    /// Concurrency bound (defaults to dispatch.concurrency)
    #[arg(long, env = "FANOUT_TH")]
    pub th: Option<String>,

    /// Global deadline in seconds (defaults to dispatch.deadline_secs)
    #[arg(long, env = "FANOUT_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,

    /// Path to configuration file (TOML or JSON); defaults apply if absent
    #[arg(short, long, default_value = "fanout.toml", env = "FANOUT_CONFIG")]
    pub config: PathBuf,

    /// Override session store directory from configuration
    #[arg(long, env = "FANOUT_STORE")]
    pub store: Option<PathBuf>,

    /// Append the report stream to this file instead of stdout
    #[arg(short, long, env = "FANOUT_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FANOUT_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `list` command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Path to configuration file; defaults apply if absent
    #[arg(short, long, default_value = "fanout.toml", env = "FANOUT_CONFIG")]
    pub config: PathBuf,

    /// Override session store directory from configuration
    #[arg(long, env = "FANOUT_STORE")]
    pub store: Option<PathBuf>,

    /// Output as a JSON array
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "fanout.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
