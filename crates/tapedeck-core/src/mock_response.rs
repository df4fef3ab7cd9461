//! The in-memory unit served by the mock engine.

use crate::content_type::EVENT_STREAM_CONTENT_TYPE;
use crate::headers::HeaderMap;
use crate::sse::StoredEvent;

/// A fully-materialized mock response, built from a record at startup (or
/// from a scenario's referenced record).
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// URL path component only.
    pub path: String,
    /// Full URL as originally recorded, kept for the `/__mock__/list`
    /// projection.
    pub full_url: String,
    /// Upper-cased HTTP method.
    pub method: String,
    /// The mock-id this response is filed under.
    pub mock_id: String,
    /// Normalized content-type (parameters stripped).
    pub content_type: String,
    /// HTTP status code to replay.
    pub status_code: u16,
    /// Response headers, original case preserved.
    pub headers: HeaderMap,
    /// Pre-serialized body bytes, ready to write directly when timing
    /// replay is off (or the body isn't SSE).
    pub body_bytes: Vec<u8>,
    /// Ordered SSE events, non-empty iff `is_sse`. Used for timed replay.
    pub sse_events: Vec<StoredEvent>,
    /// True iff `content_type == "text/event-stream"`.
    pub is_sse: bool,
    /// Recorded delay, in seconds.
    pub delay: f64,
    /// `request.request_id` from the source record, if any.
    pub request_id: Option<String>,
}

impl MockResponse {
    /// True iff this response carries SSE events suitable for timed replay
    /// (as opposed to a flat string SSE body with no timing information).
    pub fn has_timed_sse_events(&self) -> bool {
        self.is_sse && !self.sse_events.is_empty()
    }
}
