//! Shared state handed to every proxy request handler.

use std::path::PathBuf;

/// Application state shared across all request handlers via `Arc`.
pub struct AppState {
    /// Base URL of the upstream, e.g. `https://api.example.com`. Never ends
    /// in a trailing slash.
    pub upstream_base: String,
    /// The upstream HTTP client, pre-configured with an optional mTLS
    /// identity.
    pub client: reqwest::Client,
    /// Directory records are written under.
    pub log_dir: PathBuf,
}

impl AppState {
    /// Build proxy application state.
    pub fn new(upstream_base: String, client: reqwest::Client, log_dir: PathBuf) -> Self {
        Self {
            upstream_base: upstream_base.trim_end_matches('/').to_string(),
            client,
            log_dir,
        }
    }

    /// Resolve a request path (plus optional query string) against the
    /// configured upstream base.
    pub fn upstream_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.upstream_base, path_and_query)
    }
}
