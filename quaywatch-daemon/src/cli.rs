//! CLI argument definitions for quaywatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Quaywatch readiness-probe sidecar.
///
/// Watches the log streams of configured containers for their readiness
/// markers and serves the aggregate status over HTTP.
#[derive(Parser, Debug)]
#[command(name = "quaywatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to quaywatch.toml configuration file.
    #[arg(short, long, default_value = "/etc/quaywatch/quaywatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the status endpoint port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
