//! `tracing`/`tracing-subscriber` bootstrap, initialized before any other
//! startup work.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Default filter `tapedeck=info`,
/// overridable via `RUST_LOG`.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tapedeck=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
