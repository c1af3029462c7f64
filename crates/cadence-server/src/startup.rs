//! Server startup helper for embedding in the driver binary.
//!
//! Provides [`spawn_server`] which launches the HTTP + `WebSocket` server
//! on a background Tokio task, so it runs concurrently with the
//! simulation's update loop.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the status server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the status server on a background Tokio task.
///
/// The server runs until the Tokio runtime is shut down or the task is
/// aborted. The caller should hold the returned handle and abort or await
/// it during clean shutdown.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address cannot be
/// parsed; bind failures surface asynchronously in the task and are
/// logged there.
pub async fn spawn_server(
    config: ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    // Catch obvious misconfigurations before spawning the background task;
    // the actual bind happens inside start_server.
    let addr_str = format!("{}:{}", config.host, config.port);
    let _: std::net::SocketAddr = addr_str.parse().map_err(|e| {
        StartupError::Server(ServerError::Bind(format!("invalid address {addr_str}: {e}")))
    })?;

    let port = config.port;
    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "status server exited with error");
        }
    });

    tracing::info!(port, "status server spawned on background task");

    Ok(handle)
}
