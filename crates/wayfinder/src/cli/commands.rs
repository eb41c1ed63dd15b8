//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Override the configured bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the configured port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Serve HTTPS with this PEM certificate chain
    #[arg(long, value_name = "FILE", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// Private key for --tls-cert
    #[arg(long, value_name = "FILE", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,
}

/// Dashboard command arguments.
#[derive(Debug, Args)]
pub struct DashboardCommand {
    /// Family to report on
    pub family: String,

    /// Lookback window in minutes (defaults to the configured window)
    #[arg(short, long)]
    pub minutes: Option<i64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Map command arguments.
#[derive(Debug, Args)]
pub struct MapCommand {
    /// Family to project
    pub family: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Device command arguments.
#[derive(Debug, Args)]
pub struct DeviceCommand {
    /// Family the device reports to
    pub family: String,

    /// Device identifier
    pub device: String,

    /// Lookback window in minutes (defaults to the configured window)
    #[arg(short, long)]
    pub minutes: Option<i64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Family management commands.
#[derive(Debug, Subcommand)]
pub enum FamilyCommand {
    /// List families in the data directory
    List,

    /// Delete a family and all of its data
    Delete {
        /// Family to delete
        family: String,
    },
}

/// Location management commands.
#[derive(Debug, Subcommand)]
pub enum LocationCommand {
    /// List a family's locations and their map hashes
    List {
        /// Family to list
        family: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Delete a location and the records classified to it
    Delete {
        /// Family owning the location
        family: String,

        /// Location label
        location: String,
    },
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

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
