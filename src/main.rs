//! CLI entry point for flamewatch.
//!
//! Provides the command-line interface for:
//! - Monitoring a hub over a USB-serial link (`serial`)
//! - Monitoring a hub over a local-network socket (`tcp`)
//! - Running against a built-in simulated hub (`simulate`)
//! - Enumerating serial ports (`ports`)
//!
//! The monitor runs until the link ends or Ctrl+C requests shutdown; the
//! session then tears the link down and reports the incident tally.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flamewatch::config::{MonitorConfig, DEFAULT_CONFIG_PATH};
use flamewatch::monitor::{FireMonitor, LinkSession};
use flamewatch::siren::LogSiren;
use flamewatch::trace;
use flamewatch::transport::{serial, SerialLink, SimulatedHub, TcpLink, Transport};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "flamewatch")]
#[command(about = "Flame-sensor hub monitor", long_about = None)]
struct Cli {
    /// Configuration file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit every state snapshot as a JSON line on stdout (dashboard feed).
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor a hub over a USB-serial link.
    Serial {
        /// Serial port path (overrides configuration).
        #[arg(long)]
        port: Option<String>,

        /// Baud rate (overrides configuration).
        #[arg(long)]
        baud: Option<u32>,
    },

    /// Monitor a hub over a local-network TCP socket.
    Tcp {
        /// Hub host address (overrides configuration).
        #[arg(long)]
        host: Option<String>,

        /// Hub port (overrides configuration).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Monitor a built-in simulated hub (no hardware required).
    Simulate {
        /// Milliseconds between generated frames.
        #[arg(long, default_value = "500")]
        interval_ms: u64,
    },

    /// List serial ports visible on this machine.
    Ports,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = MonitorConfig::load_checked(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    trace::init_from_config(&config).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Serial { port, baud } => {
            let port = port.unwrap_or_else(|| config.link.serial.port.clone());
            let baud = baud.unwrap_or(config.link.serial.baud);
            run_session(&config, Box::new(SerialLink::new(port, baud)), cli.json).await
        }
        Commands::Tcp { host, port } => {
            let host = host.unwrap_or_else(|| config.link.tcp.host.clone());
            let port = port.unwrap_or(config.link.tcp.port);
            run_session(&config, Box::new(TcpLink::new(host, port)), cli.json).await
        }
        Commands::Simulate { interval_ms } => {
            let hub = SimulatedHub::new(Duration::from_millis(interval_ms));
            run_session(&config, Box::new(hub), cli.json).await
        }
        Commands::Ports => list_ports(),
    }
}

/// Run one monitoring session over the given transport until the link ends
/// or Ctrl+C.
async fn run_session(
    config: &MonitorConfig,
    transport: Box<dyn Transport>,
    json: bool,
) -> Result<()> {
    let monitor = FireMonitor::from_config(config, Box::new(LogSiren::new()));
    let (session, handle) = LinkSession::new(transport, monitor);

    if json {
        emit_json_snapshots(&handle);
    }

    info!("{} starting", config.application.name);
    let runner = tokio::spawn(session.run());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received");
            handle.shutdown();
        }
        // The session can also end on its own (peer close, link failure)
        _ = runner_done(&handle) => {}
    }

    let outcome = runner.await.context("session task panicked")?;
    let snapshot = handle.snapshot();
    info!(
        incidents = snapshot.alarm.incident_count,
        connection = %snapshot.connection,
        "session ended"
    );

    if let Err(err) = outcome {
        error!("session failed: {}", err);
        return Err(err.into());
    }
    Ok(())
}

/// Resolves when the session stops publishing (its side of the watch
/// channel is gone).
async fn runner_done(handle: &flamewatch::SessionHandle) {
    let mut updates = handle.updates();
    // changed() errors once the session drops its sender
    while updates.changed().await.is_ok() {}
}

/// Stream every published snapshot to stdout as one JSON object per line,
/// for a dashboard frontend to consume.
fn emit_json_snapshots(handle: &flamewatch::SessionHandle) {
    let mut updates = handle.updates();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow().clone();
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{}", line),
                Err(err) => tracing::warn!("snapshot serialization failed: {}", err),
            }
        }
    });
}

/// Print serial ports, one per line.
fn list_ports() -> Result<()> {
    let ports = serial::available_ports().context("enumerating serial ports")?;
    if ports.is_empty() {
        println!("no serial ports found");
        return Ok(());
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}
