//! Serial sensor bridge
//!
//! Reads newline-terminated readings from a serial port and publishes each
//! new value to a file-backed key-value store until interrupted.
//!
//! ## Usage
//!
//! ```bash
//! # List available serial ports
//! serial_kv_bridge --list-ports
//!
//! # Bridge COM4 (the default) into ./Software/HWiNFO64/...
//! serial_kv_bridge
//!
//! # Specific port and store location
//! serial_kv_bridge --port /dev/ttyACM0 --store-root /var/lib/sensors
//!
//! # Everything from a TOML file, flags still win
//! serial_kv_bridge --config bridge.toml --log-level debug
//!
//! # Read lines from stdin instead of a serial port
//! socat - TCP:sensor.local:7000 | serial_kv_bridge --stdin
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use serial_kv_bridge::adapters::serial::describe_ports;
use serial_kv_bridge::adapters::ReaderSource;
use serial_kv_bridge::bridge::{self, assemble};
use serial_kv_bridge::{BridgeConfig, ShutdownController};

#[derive(Parser, Debug)]
#[command(
    name = "serial_kv_bridge",
    version,
    about = "Publish serial sensor readings to a key-value store"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial device (COM4, /dev/ttyUSB0)
    #[arg(long)]
    port: Option<String>,

    /// Baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Directory under which the key path is created
    #[arg(long)]
    store_root: Option<PathBuf>,

    /// Key path, segments separated by '/' or '\'
    #[arg(long)]
    key_path: Option<String>,

    /// Read lines from stdin instead of a serial port
    #[arg(long, conflicts_with_all = ["port", "baud"])]
    stdin: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Log filter directive (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if cli.list_ports {
        return list_ports();
    }

    let config = load_config(&cli)?;
    let controller =
        ShutdownController::install().context("failed to install signal handlers")?;
    let token = controller.token();

    let summary = if cli.stdin {
        assemble(&config, bridge::open_store, |_| {
            Ok(ReaderSource::new(std::io::stdin(), "stdin"))
        })?
        .run(&token)
    } else {
        assemble(&config, bridge::open_store, bridge::open_serial)?.run(&token)
    };

    info!(
        published = summary.stats.published,
        last = summary.last_published.as_deref().unwrap_or("-"),
        "Bridge stopped"
    );
    Ok(())
}

fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BridgeConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(root) = &cli.store_root {
        config.store.root = root.clone();
    }
    if let Some(key_path) = &cli.key_path {
        config.store.key_path = key_path.clone();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn list_ports() -> Result<()> {
    let ports = serialport::available_ports().context("failed to enumerate serial ports")?;
    println!("Available serial ports:");
    if ports.is_empty() {
        println!("  (none)");
    }
    for line in describe_ports(&ports) {
        println!("  {line}");
    }
    Ok(())
}
