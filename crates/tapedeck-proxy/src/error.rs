//! Startup- and request-time errors for the recording proxy.

use thiserror::Error;

/// Errors that can abort `tapedeck-proxy` startup.
#[derive(Debug, Error)]
pub enum ProxyError {
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

    /// An mTLS client certificate or key could not be loaded.
    #[error("failed to load client TLS material: {0}")]
    Tls(String),

    /// Dial/write/read failure against the upstream, before any response
    /// bytes reached the client. Surfaces as a 502 per the `upstream_error`
    /// taxonomy entry.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// A record could not be persisted to disk.
    #[error("failed to persist record: {0}")]
    Persistence(#[from] tapedeck_core::CodecError),
}
