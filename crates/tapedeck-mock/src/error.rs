//! Startup-fatal errors for the mock server: load-time errors propagate to
//! the CLI entry point and abort; request-time errors never do.

use thiserror::Error;

/// Errors that can abort `tapedeck-mock` startup.
#[derive(Debug, Error)]
pub enum MockError {
    /// The mock index failed to load.
    #[error("failed to load mock index: {0}")]
    Index(#[from] tapedeck_core::CoreError),

    /// The scenario config failed to load.
    #[error("failed to load scenario config: {0}")]
    Scenario(#[from] tapedeck_core::ScenarioError),

    /// The CLI flags did not validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The server failed to bind its listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
