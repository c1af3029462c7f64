//! Error types for the demo driver binary.
//!
//! [`SimError`] is the top-level error type that wraps all possible
//! failure modes during startup.

/// Top-level error for the demo driver binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// Status server failed to start.
    #[error("server error: {source}")]
    Server {
        /// The underlying startup error.
        #[from]
        source: cadence_server::startup::StartupError,
    },

    /// The owner thread could not be spawned.
    #[error("owner thread error: {message}")]
    Thread {
        /// Description of the thread failure.
        message: String,
    },
}
