//! Traffic Mirror
//!
//! Run with: cargo run -p viz
//!
//! Examples:
//!   cargo run -p viz -- --host 10.0.0.5 --port 8765
//!   cargo run -p viz -- --config mirror.toml --step-interval 0.25

use bevy::prelude::*;
use clap::Parser;
use std::path::PathBuf;
use sync_core::{ClientConfig, ConfigError};
use viz::plugin::DEFAULT_LOG_FILTER;
use viz::MirrorVizPlugin;

/// Traffic Mirror
#[derive(Parser, Debug)]
#[command(name = "viz")]
#[command(about = "Real-time 3D mirror of a remote traffic simulation")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulation host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Simulation port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Seconds between step commands (overrides the config file)
    #[arg(long)]
    step_interval: Option<f32>,

    /// Give up after the first connection drops instead of reconnecting
    #[arg(long)]
    no_reconnect: bool,

    /// Log filter directives
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Loads the configuration file, if any, and applies command-line overrides.
    fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(host) = &self.host {
            config.connection.host = host.clone();
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(interval) = self.step_interval {
            config.cadence.step_interval_secs = interval;
        }
        if self.no_reconnect {
            config.connection.reconnect = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();

    let config = match args.client_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("viz: {}", err);
            std::process::exit(2);
        }
    };

    if args.print_config {
        match config.to_toml() {
            Ok(toml) => print!("{}", toml),
            Err(err) => {
                eprintln!("viz: {}", err);
                std::process::exit(2);
            }
        }
        return;
    }

    App::new()
        .insert_resource(config)
        .add_plugins(MirrorVizPlugin {
            log_filter: args.log_filter,
        })
        .run();
}
