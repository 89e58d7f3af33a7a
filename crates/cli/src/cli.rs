//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stability Engine - settles noisy position fixes into a stable location
#[derive(Parser, Debug)]
#[command(
    name = "stability-engine",
    author,
    version,
    about = "Location stability engine runner",
    long_about = "Feeds fixes from a mock or recorded provider through the location stability \n\
                  engine, drives a scripted movement feed, and routes every published \n\
                  estimate to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STABILITY_ENGINE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STABILITY_ENGINE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an engine session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "stability.toml",
        env = "STABILITY_ENGINE_CONFIG"
    )]
    pub config: PathBuf,

    /// Stop after this many seconds (0 = run until Ctrl+C)
    #[arg(long, default_value = "0", env = "STABILITY_ENGINE_DURATION")]
    pub duration: u64,

    /// Stop once this many estimates were published (0 = unlimited)
    #[arg(long, default_value = "0", env = "STABILITY_ENGINE_MAX_UPDATES")]
    pub max_updates: u64,

    /// Replay fixes from this JSON-lines file instead of the configured provider
    #[arg(long, env = "STABILITY_ENGINE_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier (with --replay)
    #[arg(long, requires = "replay")]
    pub replay_speed: Option<f64>,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Prometheus metrics port (disabled when omitted)
    #[arg(long, env = "STABILITY_ENGINE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "stability.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "stability.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the sampling policy table
    #[arg(long)]
    pub policies: bool,

    /// Show the movement script
    #[arg(long)]
    pub movement: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
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
