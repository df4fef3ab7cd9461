//! Tracing bootstrap, mirroring `tapedeck_mock::logging`.

use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber. Must run before any other
/// startup work so early failures are still logged.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tapedeck=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
