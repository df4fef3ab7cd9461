//! Shared record-persistence helper for both the plain-forwarding and SSE
//! recording paths.

use std::path::Path;

use serde_json::Value;
use tapedeck_core::codec;
use tapedeck_core::headers::HeaderMap;

/// Build and write one record file under `<log_dir>/<mock_id>/`, where
/// `mock_id` is resolved from the request's `x-mock-id` header (falling
/// back to `"default"`). Failures are logged at `warn` and swallowed: a
/// persistence failure must never take down the proxy or fail the
/// upstream response already sent to the client.
#[allow(clippy::too_many_arguments)]
pub fn write_record(
    log_dir: &Path,
    method: &str,
    url: &str,
    request_headers: &HeaderMap,
    request_body: &Value,
    status_code: u16,
    response_headers: &HeaderMap,
    response_body: &Value,
    delay: f64,
) {
    let mock_id = request_headers
        .get(tapedeck_core::record::MOCK_ID_HEADER)
        .filter(|v| !v.is_empty())
        .unwrap_or("default")
        .to_string();

    let now = chrono::Utc::now();
    let request_id = codec::generate_request_id(now);
    let record = codec::RecordToWrite {
        method,
        url,
        request_headers,
        request_body,
        status_code,
        response_headers,
        response_body,
        delay,
    };
    let document = codec::build_record_document(&request_id, &record);

    let content_type = response_headers
        .get("content-type")
        .map(tapedeck_core::content_type::normalize)
        .unwrap_or_else(|| tapedeck_core::content_type::DEFAULT_CONTENT_TYPE.to_string());

    let mut rng = rand::rng();
    let file_name = codec::record_file_name(&content_type, now, &mut rng);

    if let Err(err) = codec::write_record_file(log_dir, Some(&mock_id), &file_name, &document) {
        tracing::warn!(error = %err, dir = %log_dir.display(), mock_id, "failed to persist recorded exchange");
    }
}
