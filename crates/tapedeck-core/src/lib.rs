//! # tapedeck-core
//!
//! Shared engine for the tapedeck capture/replay toolkit: the on-disk record
//! format, the in-memory mock index, and the scenario matcher. This crate
//! has no networking of its own — the mock server (`tapedeck-mock`) and the
//! recording proxy (`tapedeck-proxy`) both link against it and supply the
//! I/O.
//!
//! ## Layout
//!
//! - [`record`] — parses the on-disk record JSON into a generic tree and
//!   resolves path/mock-id/content-type from it.
//! - [`codec`] — turns a parsed record into a [`mock_response::MockResponse`]
//!   (load side) and serializes one back to disk (write side, used by the
//!   proxy).
//! - [`mock_response`] — the in-memory unit served by the mock engine.
//! - [`index`] — the composite `(path, mock_id, content_type)` lookup map.
//! - [`scenario`] — YAML-driven declarative routing, superseding the index
//!   when active.
//! - [`sse`] — the SSE event model shared by the replay writer and the
//!   recorder.
//! - [`jitter`] — injectable randomness for delay jitter and SSE jitter
//!   scale.
//! - [`content_type`] — content-type normalization.
//! - [`headers`] — the hop-by-hop/internal header skip set.

pub mod codec;
pub mod content_type;
pub mod error;
pub mod headers;
pub mod index;
pub mod jitter;
pub mod mock_response;
pub mod record;
pub mod scenario;
pub mod sse;

pub use error::{CodecError, CoreError, ScenarioError};
pub use index::Index;
pub use mock_response::MockResponse;
pub use scenario::{Scenario, ScenarioSet};
