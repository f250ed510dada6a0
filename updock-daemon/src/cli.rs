//! CLI argument definitions for updock-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Updock automatic container update daemon.
///
/// Periodically checks running containers for newer images and updates
/// them along the path their deployment mode requires.
#[derive(Parser, Debug)]
#[command(name = "updock-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to updock.toml configuration file.
    #[arg(short, long, default_value = "/etc/updock/updock.toml")]
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

    /// Report what would be updated without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Run a single pass and exit instead of looping.
    #[arg(long)]
    pub once: bool,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}
