//! Command-line surface for the mock server.

use std::path::PathBuf;

use clap::Parser;

/// Replay captured HTTP exchanges against matching requests.
#[derive(Parser, Debug)]
#[command(name = "tapedeck-mock", version, about)]
pub struct Cli {
    /// Root directory for the mock index.
    #[arg(long = "mock-dir", default_value = "mocks")]
    pub mock_dir: PathBuf,

    /// Path to a scenario YAML. When set, activates scenario mode and
    /// disables header-based lookup.
    #[arg(long = "mock-config")]
    pub mock_config: Option<PathBuf>,

    /// Directory for 404 records. An empty string disables 404 logging.
    #[arg(long = "log-dir", default_value = "mock_log")]
    pub log_dir: String,

    /// Bind address.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Enable delay-and-jitter replay behavior for SSE and non-SSE bodies.
    #[arg(long = "replay-timing", default_value_t = false)]
    pub replay_timing: bool,

    /// Multiplicative jitter range in `[0, 1]`, e.g. `0.1` for ±10%.
    #[arg(long, default_value_t = 0.0)]
    pub jitter: f64,
}

impl Cli {
    /// Validate flag combinations that `clap` cannot express on its own.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(format!("--jitter must be in [0, 1], got {}", self.jitter));
        }
        Ok(())
    }
}
