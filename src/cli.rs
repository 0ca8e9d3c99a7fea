//! CLI definitions for Cadence.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cadence CLI.
#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "In-process job scheduler")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.cadence/config.toml)
    #[arg(short, long, env = "CADENCE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the scheduler in foreground until Ctrl-C (default)
    Run,

    /// List the built-in job classes
    Classes {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Validate a configuration file
    CheckConfig,
}

/// Get the .cadence directory path.
pub(crate) fn cadence_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".cadence"))
        .unwrap_or_else(|| PathBuf::from(".cadence"))
}

pub(crate) fn default_config_path() -> PathBuf {
    cadence_dir().join("config.toml")
}
