//! CLI definitions for cachet-monitor.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// cachet-monitor CLI.
#[derive(Parser)]
#[command(name = "cachet-monitor")]
#[command(about = "Monitors URLs and reports their health to a Cachet status page")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Monitor every configured endpoint until interrupted
    Run {
        /// Configuration file path
        #[arg(short, long, env = "CACHET_MONITOR_CONFIG", default_value = "config.yml")]
        config: PathBuf,

        /// Serve /health and /metrics on this address
        #[arg(long)]
        status_addr: Option<SocketAddr>,

        /// Also write daily-rotated log files to this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Console log format
        #[arg(long, value_enum, default_value_t = LogFormat::Text)]
        log_format: LogFormat,

        /// Abort endpoint checks still running this many seconds after a
        /// shutdown signal
        #[arg(long)]
        shutdown_deadline: Option<u64>,
    },

    /// Check a configuration file and report errors and warnings
    Validate {
        /// Configuration file path
        #[arg(short, long, env = "CACHET_MONITOR_CONFIG", default_value = "config.yml")]
        config: PathBuf,
    },

    /// Write a configuration with one endpoint per enabled Cachet component
    GenerateConfig {
        /// Cachet API URL, e.g. https://demo.cachethq.io/api/v1
        api_url: String,

        /// Cachet API token
        token: String,

        /// Output file
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}
