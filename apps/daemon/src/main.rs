//! gridoscd - bridges a monome grid's USB-serial protocol to OSC clients
//! over UDP, reproducing the serialosc service contract.
//!
//! This is the binary entry point; the actual bridging lives in the
//! `bridge` library crate.

use anyhow::{Context, Result};
use bridge::{Bridge, BridgeMessage, DiscoveryServer, BRIDGE_QUEUE_DEPTH};
use clap::Parser;
use core_types::{SerialConfig, DISCOVERY_PORT};
use std::path::PathBuf;
use tokio::sync::mpsc;
use transport_serial::SerialLink;

#[derive(Parser)]
#[command(name = "gridoscd")]
#[command(version)]
#[command(about = "Bridge a monome grid to OSC clients over UDP")]
struct Cli {
    /// Path to the grid's serial device (e.g. /dev/ttyUSB0)
    tty: PathBuf,

    /// Enable verbose logging
    #[arg(short = 'd', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();

    if !cli.tty.exists() {
        eprintln!("serial device {} does not exist", cli.tty.display());
        std::process::exit(1);
    }

    let tty = cli.tty.to_string_lossy();
    let link = SerialLink::open(&tty, &SerialConfig::default())
        .with_context(|| format!("failed to open serial device {tty}"))?;
    let writer = link.writer()?;

    let (tx, rx) = mpsc::channel(BRIDGE_QUEUE_DEPTH);

    // The serial read thread feeds its own queue; a forwarder folds it
    // into the bridge queue so the loop sees one ordered stream.
    let (serial_tx, mut serial_rx) = mpsc::channel(BRIDGE_QUEUE_DEPTH);
    link.spawn_reader(serial_tx)?;
    let serial_forward_tx = tx.clone();
    tokio::spawn(async move {
        while let Some(event) = serial_rx.recv().await {
            if serial_forward_tx
                .send(BridgeMessage::Serial(event))
                .await
                .is_err()
            {
                return;
            }
        }
    });

    let discovery = DiscoveryServer::bind(DISCOVERY_PORT)
        .await
        .context("failed to bind discovery port")?;
    tokio::spawn(discovery.run(tx.clone()));

    let mut bridge = Bridge::new(Box::new(writer), tx);
    bridge
        .init()
        .with_context(|| format!("failed to query the device on {tty}"))?;

    log::info!("bridging {tty}, discovery on udp {DISCOVERY_PORT}");

    tokio::select! {
        result = bridge.run(rx) => {
            result.context("bridge terminated")?;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("interrupt received, shutting down");
        }
    }

    Ok(())
}
