//! MIDI bridge entry point.
//!
//! Wires the hardware backend, device registry and connection manager
//! together and serves clients until Ctrl-C (or `q` in interactive mode).
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config file, apply CLI overrides
//!  └─ DeviceRegistry::open_all()      -- hardware inputs stream into ClientLink
//!  └─ Console (with -i)               -- stdin thread → command loop
//!  └─ ConnectionManager::run()        -- accept loop, one client at a time
//!  └─ DeviceRegistry::close_all()
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use midi_bridge::application::{DeviceRegistry, TraceLog};
use midi_bridge::infrastructure::console::{spawn_stdin_reader, Console};
use midi_bridge::infrastructure::midi_backend::mock::MockBackend;
use midi_bridge::infrastructure::midi_backend::MidiBackend;
use midi_bridge::infrastructure::network::{ClientLink, ConnectionManager};
use midi_bridge::infrastructure::storage::config::{
    load_config, load_config_from, save_config, save_config_to, AppConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Bridges a local MIDI interface to one remote TCP client.
#[derive(Debug, Parser)]
#[command(name = "midi-bridge", version)]
struct Cli {
    /// TCP port to listen on (overrides the config file).
    #[arg(long, env = "MIDI_BRIDGE_PORT")]
    port: Option<u16>,

    /// IP address to bind to (overrides the config file).
    #[arg(long, env = "MIDI_BRIDGE_BIND")]
    bind: Option<String>,

    /// Config file to use instead of the platform default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the command console on stdin.
    #[arg(short, long)]
    interactive: bool,

    /// Start with the MIDI trace table enabled.
    #[arg(long)]
    trace: bool,

    /// Do not open any device at startup.
    #[arg(long)]
    no_open: bool,

    /// Use the in-memory MIDI backend instead of hardware devices.
    #[arg(long)]
    mock: bool,

    /// Write the effective configuration to the config file and exit.
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    fn load_file_config(&self) -> anyhow::Result<AppConfig> {
        match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display())),
            None => load_config().context("failed to load config"),
        }
    }

    /// Applies command-line overrides on top of the file settings.
    fn apply_overrides(&self, mut config: AppConfig) -> AppConfig {
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(bind) = &self.bind {
            config.network.bind_address = bind.clone();
        }
        if self.trace {
            config.logging.trace_midi = true;
        }
        if self.no_open {
            config.devices.open_all_on_start = false;
        }
        config
    }
}

/// Picks the MIDI backend: hardware unless `--mock` was given.
fn make_backend(use_mock: bool) -> anyhow::Result<Arc<dyn MidiBackend>> {
    if use_mock {
        warn!("using the in-memory MIDI backend");
        return Ok(Arc::new(MockBackend::new(&["Mock Input"], &["Mock Output"])));
    }
    hardware_backend()
}

#[cfg(feature = "hardware")]
fn hardware_backend() -> anyhow::Result<Arc<dyn MidiBackend>> {
    use midi_bridge::infrastructure::midi_backend::midir::MidirBackend;
    let backend = MidirBackend::new().context("failed to initialise MIDI")?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "hardware"))]
fn hardware_backend() -> anyhow::Result<Arc<dyn MidiBackend>> {
    anyhow::bail!(
        "built without MIDI hardware support; rebuild with `--features hardware` or pass --mock"
    )
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app_config = cli.apply_overrides(cli.load_file_config()?);

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config.logging.level)),
        )
        .init();

    if cli.write_default_config {
        let path = match &cli.config {
            Some(path) => save_config_to(path, &app_config).map(|()| path.clone()),
            None => save_config(&app_config),
        }
        .context("failed to write config")?;
        info!("configuration written to {}", path.display());
        return Ok(());
    }

    let config = app_config
        .to_bridge_config()
        .context("invalid network configuration")?;
    info!("MIDI bridge starting on {}", config.bind_addr);

    // ── Devices ───────────────────────────────────────────────────────────────
    let trace = Arc::new(TraceLog::new(config.trace_midi));
    let link = Arc::new(ClientLink::new());
    let backend = make_backend(cli.mock)?;
    let registry = Arc::new(DeviceRegistry::new(
        backend,
        Arc::clone(&link) as _,
        Arc::clone(&trace),
    ));
    if config.open_all_on_start {
        registry.open_all();
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                ctrl_c_tx.send_replace(true);
            }
            Err(e) => error!("failed to listen for Ctrl-C: {e}"),
        }
    });

    // ── Console ───────────────────────────────────────────────────────────────
    if cli.interactive {
        let console = Console::new(
            Arc::clone(&registry),
            Arc::clone(&trace),
            shutdown_tx.clone(),
        );
        let lines = spawn_stdin_reader();
        tokio::spawn(async move {
            if let Err(e) = console.run(lines, tokio::io::stdout()).await {
                error!("console failed: {e}");
            }
        });
    }

    // ── Accept loop ───────────────────────────────────────────────────────────
    let manager = ConnectionManager::new(&config, Arc::clone(&registry), link);
    let result = manager.run(shutdown_rx).await;

    registry.close_all();
    result.context("connection manager failed")?;

    info!("MIDI bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
