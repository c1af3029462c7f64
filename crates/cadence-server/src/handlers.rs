//! REST endpoint handlers.
//!
//! One real endpoint: `GET /status.json`, the one-shot full-snapshot read
//! path. The snapshot is produced by the owner loop via the gate, so the
//! handler suspends for at most one loop iteration and never observes a
//! torn write.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::Uri;
use axum::response::IntoResponse;

use crate::error::ApiError;
use crate::state::AppState;

/// Serve the full merged status document.
///
/// # Route
///
/// `GET /status.json`
pub async fn status_json(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.gate.read_snapshot().await?;
    Ok(Json(snapshot))
}

/// Answer every unknown path with `404`.
pub async fn fallback(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_owned())
}
