//! Error types for the transport shell.
//!
//! [`ApiError`] unifies the handler failure modes into a single enum that
//! converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cadence_core::GateError;

/// Errors that can occur while answering a request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The state-owning loop is gone; no snapshot can be produced.
    #[error("status source unavailable: {source}")]
    Unavailable {
        /// The underlying gate error.
        #[from]
        source: GateError,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
