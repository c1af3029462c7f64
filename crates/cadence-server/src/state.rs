//! Shared application state for the transport shell.
//!
//! [`AppState`] carries only the [`StatusGate`]; the model, cache, and
//! subscriber set all live with the simulation loop on the owner thread.

use cadence_core::StatusGate;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Marshal for snapshot reads and subscriptions.
    pub gate: StatusGate,
}

impl AppState {
    /// Create application state around a gate.
    pub const fn new(gate: StatusGate) -> Self {
        Self { gate }
    }
}
