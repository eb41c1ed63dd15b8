//! `wayfinder` - CLI for the wayfinder analytics service
//!
//! This binary serves dashboards and maps over HTTP and prints them for a
//! single family from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use chrono::Utc;
use clap::Parser;

use wayfinder::cli::{
    Cli, Command, ConfigCommand, DashboardCommand, DeviceCommand, FamilyCommand, LocationCommand,
    MapCommand, OutputFormat, ServeCommand,
};
use wayfinder::config::TlsConfig;
use wayfinder::{init_logging, render, server, Analytics, Config, FamilyName, Window};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validation is its own command, so load the file it names instead
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        handle_validate(file.clone().or_else(|| cli.config.clone()));
        return Ok(());
    }

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(cmd) => handle_serve(config, &cmd),
        Command::Dashboard(cmd) => handle_dashboard(&config, &cmd),
        Command::Map(cmd) => handle_map(&config, &cmd),
        Command::Device(cmd) => handle_device(&config, &cmd),
        Command::Family(cmd) => handle_family(&config, &cmd),
        Command::Location(cmd) => handle_location(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

fn handle_serve(mut config: Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = &cmd.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let (Some(cert_path), Some(key_path)) = (&cmd.tls_cert, &cmd.tls_key) {
        config.server.tls = Some(TlsConfig {
            cert_path: cert_path.clone(),
            key_path: key_path.clone(),
        });
    }
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server::serve(&config))?;
    Ok(())
}

fn handle_dashboard(config: &Config, cmd: &DashboardCommand) -> anyhow::Result<()> {
    let analytics = Analytics::from_config(config)?;
    let family = FamilyName::parse(&cmd.family)?;
    let window = cmd.minutes.map(Window::from_minutes).transpose()?;

    let envelope = analytics.dashboard_view(&family, window, Utc::now());
    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
        OutputFormat::Plain => print!("{}", render::dashboard(&envelope)),
    }
    Ok(())
}

fn handle_map(config: &Config, cmd: &MapCommand) -> anyhow::Result<()> {
    let analytics = Analytics::from_config(config)?;
    let family = FamilyName::parse(&cmd.family)?;

    let envelope = analytics.map_view(&family, Utc::now());
    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
        OutputFormat::Plain => print!("{}", render::map(&envelope)),
    }
    Ok(())
}

fn handle_device(config: &Config, cmd: &DeviceCommand) -> anyhow::Result<()> {
    let analytics = Analytics::from_config(config)?;
    let family = FamilyName::parse(&cmd.family)?;
    let window = cmd.minutes.map(Window::from_minutes).transpose()?;

    let envelope = analytics.device_view(&family, &cmd.device, window, Utc::now());
    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
        OutputFormat::Plain => print!("{}", render::device(&envelope)),
    }
    Ok(())
}

fn handle_family(config: &Config, cmd: &FamilyCommand) -> anyhow::Result<()> {
    let analytics = Analytics::from_config(config)?;
    match cmd {
        FamilyCommand::List => {
            let families = analytics.gateway().list_families()?;
            if families.is_empty() {
                println!(
                    "No families in {}",
                    analytics.gateway().data_dir().display()
                );
            }
            for family in families {
                println!("{family}");
            }
        }
        FamilyCommand::Delete { family } => {
            let family = FamilyName::parse(family)?;
            analytics.delete_family(&family)?;
            println!("Deleted {family}");
        }
    }
    Ok(())
}

fn handle_location(config: &Config, cmd: &LocationCommand) -> anyhow::Result<()> {
    let analytics = Analytics::from_config(config)?;
    match cmd {
        LocationCommand::List { family, format } => {
            let family = FamilyName::parse(family)?;
            let envelope = analytics.locations_view(&family, Utc::now());
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
                OutputFormat::Plain => print!("{}", render::locations(&envelope)),
            }
        }
        LocationCommand::Delete { family, location } => {
            let family = FamilyName::parse(family)?;
            analytics.delete_location(&family, location)?;
            println!("Deleted location '{location}' for {family}");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.bind_addr()?);
                println!(
                    "  CORS origins:       {}",
                    config.server.cors_allowed_origins.join(", ")
                );
                println!("  Compression:        {}", config.server.compression);
                match &config.server.tls {
                    Some(tls) => {
                        println!("  TLS certificate:    {}", tls.cert_path.display());
                        println!("  TLS key:            {}", tls.key_path.display());
                    }
                    None => println!("  TLS:                off"),
                }
                println!();
                println!("[Storage]");
                println!("  Data directory:     {}", config.data_dir().display());
                println!("  Busy timeout (ms):  {}", config.storage.busy_timeout_ms);
                println!();
                println!("[Dashboard]");
                println!("  Window (minutes):   {}", config.dashboard.window_minutes);
                println!();
                println!("[Map]");
                println!("  Centroid policy:    {}", config.map.centroid_policy);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => handle_validate(file.clone()),
    }
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}
