//! # tapedeck-proxy
//!
//! The recording half of the tapedeck toolkit: a reverse proxy that
//! forwards every request to a configured upstream, captures the full
//! request/response exchange (including streaming SSE bodies), and
//! persists it in the record format `tapedeck-mock` replays.

pub mod app_state;
pub mod cli;
pub mod error;
pub mod forward;
pub mod logging;
pub mod mtls;
pub mod persist;
pub mod router;
pub mod sse;

pub use app_state::AppState;
pub use error::ProxyError;
