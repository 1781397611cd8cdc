// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ald-bridge - Log lab sensor readings from the MQTT bus to delimited files.
//!
//! Usage:
//!   ald-bridge
//!   ald-bridge --config bridge.yaml
//!   ald-bridge --host ald --port 1883 --temperature-file /data/sample_temperatures.dat

use ald_bridge::config::BridgeConfig;
use ald_bridge::schema::Category;
use ald_bridge::Bridge;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ald-bridge")]
#[command(about = "Bridge MQTT sensor readings into append-only log files")]
#[command(version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Broker port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Broker username (overrides config)
    #[arg(long)]
    username: Option<String>,

    /// Broker password (overrides config)
    #[arg(long)]
    password: Option<String>,

    /// Temperature log file (overrides config)
    #[arg(long)]
    temperature_file: Option<PathBuf>,

    /// Flow log file (overrides config)
    #[arg(long)]
    flow_file: Option<PathBuf>,

    /// Pressure log file (overrides config)
    #[arg(long)]
    pressure_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Quiet mode (minimal output)
    #[arg(short, long)]
    quiet: bool,
}

fn apply_overrides(config: &mut BridgeConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.mqtt.host = host.clone();
    }
    if let Some(port) = args.port {
        config.mqtt.port = port;
    }
    if let Some(username) = &args.username {
        config.mqtt.username = Some(username.clone());
    }
    if let Some(password) = &args.password {
        config.mqtt.password = Some(password.clone());
    }
    if let Some(path) = &args.temperature_file {
        config.outputs.temperature = path.clone();
    }
    if let Some(path) = &args.flow_file {
        config.outputs.flow = path.clone();
    }
    if let Some(path) = &args.pressure_file {
        config.outputs.pressure = path.clone();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .init();

    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    apply_overrides(&mut config, &args);

    if !args.quiet {
        info!("ALD Bridge v{}", env!("CARGO_PKG_VERSION"));
        info!("Broker: {}:{}", config.mqtt.host, config.mqtt.port);
        for category in Category::ALL {
            info!(
                "{} log: {}",
                category,
                config.outputs.path_for(category).display()
            );
        }
    }

    let bridge = Bridge::new(config);
    let interrupt = bridge.interrupt_handle();
    ctrlc::set_handler(move || interrupt.interrupt())
        .context("installing interrupt handler")?;

    info!("Bridging started. Press Ctrl+C to stop.");
    let stats = bridge.run()?;

    if !args.quiet {
        info!("Bridge stopped");
        for (category, rows) in &stats.rows {
            info!("  {} rows: {}", category, rows);
        }
        info!("  Rejected: {}", stats.rejected);
        info!("  Unbound: {}", stats.unbound);
    }

    Ok(())
}
