//! `ember-mug` command line.
//!
//! ```text
//! ember-mug serve --address C8:2E:47:00:11:22
//! ember-mug --config ember.toml serve --interval 30
//! ember-mug discover
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ember_mug_ble::ble::{BleDeviceReader, BleScanner};
use ember_mug_ble::server;
use ember_mug_ble::{Config, Coordinator, DeviceType, Result};

#[derive(Parser)]
#[command(name = "ember-mug")]
#[command(about = "Poll an Ember mug over BLE and serve its status", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the device and serve its status over HTTP
    Serve {
        /// Device address, overrides the config file
        #[arg(short, long)]
        address: Option<String>,

        /// Seconds between polls (5-300)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Device type: mug or tumbler
        #[arg(short = 't', long)]
        device_type: Option<DeviceType>,

        /// Listen address, e.g. 0.0.0.0:8080
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Scan for nearby Ember devices
    Discover,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Serve {
            address,
            interval,
            device_type,
            bind,
        } => {
            if let Some(address) = address {
                config.device.address = address;
            }
            if let Some(interval) = interval {
                config.device.scan_interval = interval;
            }
            if let Some(device_type) = device_type {
                config.device.device_type = device_type;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            run_serve(config).await
        }
        Commands::Discover => run_discover(config).await,
    }
}

async fn run_serve(config: Config) -> Result<()> {
    config.validate()?;
    let addr = config.server.bind_addr()?;

    let reader = BleDeviceReader::new()
        .await?
        .with_lookup_timeout(config.ble.lookup_timeout());
    let coordinator = Arc::new(Coordinator::start(config.device, Arc::new(reader)).await?);

    let shutdown = {
        let coordinator = coordinator.clone();
        async move {
            server::shutdown_signal().await;
            coordinator.shutdown().await;
        }
    };

    server::serve(addr, coordinator, shutdown).await
}

async fn run_discover(config: Config) -> Result<()> {
    let scanner = BleScanner::new().await?;
    let timeout = config.ble.discovery_timeout();

    let devices = scanner.discover(timeout).await?;

    if devices.is_empty() {
        warn!("No Ember devices found");
        return Ok(());
    }

    for device in devices {
        println!("{}\t{}", device.address, device.label);
    }
    Ok(())
}
