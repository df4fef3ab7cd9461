//! 404 request logging.
//!
//! Reuses `tapedeck-core`'s record-writing codec with a flat layout (no
//! per-mock-id subdirectory); file names are keyed off the `Accept`
//! header's first media type rather than a content-type, since there is
//! no recorded response to sanitize from.

use std::path::PathBuf;

use serde_json::Value;
use tapedeck_core::codec;
use tapedeck_core::headers::HeaderMap;

/// Writes unmatched requests to a flat record-format log directory.
/// Failure to write is logged at `warn` and never surfaced to the client.
pub struct Logger404 {
    log_dir: PathBuf,
}

impl Logger404 {
    /// Build a logger for `log_dir`. An empty `-log-dir` disables 404
    /// logging entirely, so callers should only construct this when the
    /// flag is non-empty.
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    /// Persist one 404 exchange. `accept_first_media_type` is the first
    /// comma-separated entry of the request's `Accept` header, already
    /// trimmed, used in place of a response content-type for file naming.
    pub fn log(
        &self,
        method: &str,
        url: &str,
        request_headers: &HeaderMap,
        request_body: &Value,
        accept_first_media_type: &str,
    ) {
        let now = chrono::Utc::now();
        let request_id = codec::generate_request_id(now);
        let response_headers = HeaderMap::default();
        let response_body = Value::Null;

        let record = codec::RecordToWrite {
            method,
            url,
            request_headers,
            request_body,
            status_code: 404,
            response_headers: &response_headers,
            response_body: &response_body,
            delay: 0.0,
        };
        let document = codec::build_record_document(&request_id, &record);

        let mut rng = rand::rng();
        let file_name = codec::record_file_name(accept_first_media_type, now, &mut rng);

        if let Err(err) = codec::write_record_file(&self.log_dir, None, &file_name, &document) {
            tracing::warn!(
                error = %err,
                dir = %self.log_dir.display(),
                "failed to write 404 log record"
            );
        }
    }
}
