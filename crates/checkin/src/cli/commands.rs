//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Check-in endpoint (overrides api.url and CHECKIN_API_URL)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Identifier to check in
    pub id: String,

    /// Check-in endpoint (overrides api.url and CHECKIN_API_URL)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Output the outcome as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to config file to validate (defaults to standard location)
        file: Option<PathBuf>,
    },
}
