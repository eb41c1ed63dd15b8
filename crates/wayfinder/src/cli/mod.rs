//! Command-line interface for wayfinder.
//!
//! This module provides the CLI structure and command handlers for the
//! `wayfinder` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DashboardCommand, DeviceCommand, FamilyCommand, LocationCommand, MapCommand,
    OutputFormat, ServeCommand,
};

/// wayfinder - Dashboard and map analytics for location tracking
///
/// Serves per-family dashboards (classifier efficacy, device status) and
/// GPS maps over HTTP, or prints them from the command line.
#[derive(Debug, Parser)]
#[command(name = "wayfinder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// Print the dashboard for a family
    Dashboard(DashboardCommand),

    /// Print the map for a family
    Map(MapCommand),

    /// Print one device's status and recent sightings
    Device(DeviceCommand),

    /// Manage families
    #[command(subcommand)]
    Family(FamilyCommand),

    /// Manage locations
    #[command(subcommand)]
    Location(LocationCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Family(FamilyCommand::List),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "wayfinder");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(cli_with(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(3, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli_with(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["wayfinder", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Command::Serve(cmd) => {
                assert_eq!(cmd.port, Some(9000));
                assert!(cmd.host.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_dashboard() {
        let cli = Cli::try_parse_from([
            "wayfinder",
            "dashboard",
            "office",
            "--minutes",
            "30",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Command::Dashboard(cmd) => {
                assert_eq!(cmd.family, "office");
                assert_eq!(cmd.minutes, Some(30));
                assert_eq!(cmd.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_map_defaults_to_plain() {
        let cli = Cli::try_parse_from(["wayfinder", "map", "office"]).unwrap();
        match cli.command {
            Command::Map(cmd) => assert_eq!(cmd.format, OutputFormat::Plain),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_tls() {
        let args = [
            "wayfinder",
            "serve",
            "--tls-cert",
            "/etc/ssl/fullchain.pem",
            "--tls-key",
            "/etc/ssl/privkey.pem",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Serve(cmd) => {
                assert_eq!(cmd.tls_cert, Some(PathBuf::from("/etc/ssl/fullchain.pem")));
                assert_eq!(cmd.tls_key, Some(PathBuf::from("/etc/ssl/privkey.pem")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_tls_needs_key() {
        let args = ["wayfinder", "serve", "--tls-cert", "/etc/ssl/fullchain.pem"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_device() {
        let args = ["wayfinder", "device", "office", "A1", "-m", "15"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Device(cmd) => {
                assert_eq!(cmd.family, "office");
                assert_eq!(cmd.device, "A1");
                assert_eq!(cmd.minutes, Some(15));
                assert_eq!(cmd.format, OutputFormat::Plain);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_location_list() {
        let args = ["wayfinder", "location", "list", "office", "--format", "json"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Location(LocationCommand::List { family, format }) => {
                assert_eq!(family, "office");
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_location_delete() {
        let args = ["wayfinder", "location", "delete", "office", "kitchen"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Location(LocationCommand::Delete { .. })
        ));
    }

    #[test]
    fn test_parse_family_delete_requires_name() {
        assert!(Cli::try_parse_from(["wayfinder", "family", "delete"]).is_err());
    }

    #[test]
    fn test_parse_with_config() {
        let args = ["wayfinder", "-c", "/custom/config.toml", "family", "list"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose() {
        let cli = Cli::try_parse_from(["wayfinder", "-vv", "family", "list"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_with_quiet() {
        let cli = Cli::try_parse_from(["wayfinder", "-q", "config", "path"]).unwrap();
        assert!(cli.quiet);
    }
}
