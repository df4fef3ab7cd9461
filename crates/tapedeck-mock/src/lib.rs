//! # tapedeck-mock
//!
//! The mock-serving half of the tapedeck toolkit: an axum HTTP server that
//! loads recorded exchanges from disk (or a scenario YAML) and replays
//! them against matching requests, with optional timing fidelity.

pub mod app_state;
pub mod cli;
pub mod error;
pub mod handler;
pub mod logging;
pub mod logging404;
pub mod replay;

pub use app_state::{AppState, ReplayConfig, Routing};
pub use error::MockError;
