//! Axum router construction.
//!
//! Two routes plus a `404` fallback, with CORS and request tracing
//! middleware. Overlay clients are typically browser sources on another
//! origin, so CORS stays permissive.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// - `GET /status.json` -- one-shot full snapshot
/// - `GET /socket` -- `WebSocket` push stream
/// - anything else -- `404`
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status.json", get(handlers::status_json))
        .route("/socket", get(ws::ws_socket))
        .fallback(handlers::fallback)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
