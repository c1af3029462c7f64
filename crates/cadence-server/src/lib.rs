//! HTTP + `WebSocket` transport shell for the Cadence telemetry
//! broadcaster.
//!
//! This crate is deliberately thin: it owns no state and holds no locks.
//! Both endpoints reach the state-owning simulation loop through the
//! [`StatusGate`](cadence_core::StatusGate):
//!
//! - **`GET /status.json`** -- one-shot full merged snapshot
//! - **`GET /socket`** -- `WebSocket` subscription; `hello` first, then one
//!   frame per publish, in exact publish order
//! - anything else -- `404`
//!
//! A failure on one socket tears down only that subscriber; the hub and
//! every other connection are unaffected.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::spawn_server;
pub use state::AppState;
