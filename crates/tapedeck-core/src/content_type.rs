//! Content-type normalization.
//!
//! Strips `;...` parameters, trims surrounding whitespace, and defaults to
//! `application/json` when absent. Normalization is idempotent and does
//! *not* lower-case — key comparisons in the index are byte-exact, so
//! callers must normalize both sides before comparing.

/// The content-type assumed when a record or request omits one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// The media type identifying a Server-Sent Events body.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Strip `;...` parameters and surrounding whitespace from a content-type
/// (or `Accept`-style media-type) string, defaulting to
/// [`DEFAULT_CONTENT_TYPE`] when `raw` is empty.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)` for all inputs.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_CONTENT_TYPE.to_string();
    }
    let without_params = trimmed.split(';').next().unwrap_or(trimmed).trim();
    if without_params.is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        without_params.to_string()
    }
}
