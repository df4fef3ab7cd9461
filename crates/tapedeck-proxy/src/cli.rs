//! Command-line surface for the recording proxy.

use std::path::PathBuf;

use clap::Parser;

/// Forward HTTP traffic to an upstream, recording every exchange to disk.
#[derive(Parser, Debug)]
#[command(name = "tapedeck-proxy", version, about)]
pub struct Cli {
    /// Base URL of the upstream to forward requests to, e.g.
    /// `https://api.example.com`.
    #[arg(long)]
    pub upstream: String,

    /// Bind address.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 8001)]
    pub port: u16,

    /// Directory records are written under, one subdirectory per mock-id.
    #[arg(long = "log-dir", default_value = "mocks")]
    pub log_dir: PathBuf,

    /// Client certificate for mTLS to the upstream (PEM).
    #[arg(long = "tls-cert", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// Client private key for mTLS to the upstream (PEM).
    #[arg(long = "tls-key", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,
}

impl Cli {
    /// Validate flag combinations that `clap` cannot express on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.upstream.trim().is_empty() {
            return Err("--upstream must not be empty".to_string());
        }
        if reqwest::Url::parse(&self.upstream).is_err() {
            return Err(format!("--upstream is not a valid URL: {}", self.upstream));
        }
        Ok(())
    }
}
