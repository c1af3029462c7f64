//! Demo driver binary for the Cadence telemetry broadcaster.
//!
//! Wires together the status server and a scripted simulation: the
//! simulation loop runs on a dedicated owner thread holding the
//! [`TelemetryHub`], while the Tokio runtime serves `GET /status.json`
//! and the `/socket` push stream through the gate.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `cadence-config.yaml`
//! 3. Create the hub and gate around a fresh status model
//! 4. Start the status server on a background Tokio task
//! 5. Spawn the owner thread running the scripted driver
//! 6. Wait for Ctrl-C or script completion, then join the owner thread

mod config;
mod driver;
mod error;
mod scoring;
mod script;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cadence_core::TelemetryHub;
use cadence_server::server::ServerConfig;
use cadence_server::startup::spawn_server;
use cadence_server::state::AppState;
use cadence_types::StatusModel;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::DriverConfig;
use crate::driver::Driver;
use crate::error::SimError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("cadence-sim starting");

    let config = load_config()?;
    info!(
        port = config.server.port,
        seed = config.playthrough.seed,
        notes = config.playthrough.notes_count,
        repeat = config.playthrough.repeat,
        "configuration loaded"
    );

    // The hub is constructed here but first touched on the owner thread,
    // which pins ownership there.
    let (hub, gate) = TelemetryHub::new(StatusModel::default());

    let state = Arc::new(AppState::new(gate));
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let _server = spawn_server(server_config, state).await.map_err(SimError::from)?;

    let stop = Arc::new(AtomicBool::new(false));
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

    let worker_stop = Arc::clone(&stop);
    let worker = std::thread::Builder::new()
        .name(String::from("cadence-owner"))
        .spawn(move || {
            Driver::new(hub, config).run(worker_stop.as_ref());
            let _ = done_tx.send(());
        })
        .map_err(|e| SimError::Thread {
            message: e.to_string(),
        })?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            stop.store(true, Ordering::Relaxed);
        }
        _ = done_rx => {
            info!("script complete");
        }
    }

    match tokio::task::spawn_blocking(move || worker.join()).await {
        Ok(Ok(())) => info!("owner thread joined"),
        _ => tracing::warn!("owner thread exited abnormally"),
    }

    info!("cadence-sim shutdown complete");
    Ok(())
}

/// Load the driver configuration from `cadence-config.yaml`.
///
/// Looks for the config file relative to the current working directory;
/// a missing file falls back to defaults.
fn load_config() -> Result<DriverConfig, SimError> {
    let config_path = Path::new("cadence-config.yaml");
    if config_path.exists() {
        let config = DriverConfig::from_file(config_path).map_err(SimError::from)?;
        Ok(config)
    } else {
        info!("config file not found, using defaults");
        Ok(DriverConfig::default())
    }
}
