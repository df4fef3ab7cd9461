//! Materializing a parsed record into a [`MockResponse`], and writing a
//! record back to disk in the proxy's on-disk layout.

use std::io::Read;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng;
use serde_json::{Map, Value};

use crate::content_type::EVENT_STREAM_CONTENT_TYPE;
use crate::error::CodecError;
use crate::headers::HeaderMap;
use crate::mock_response::MockResponse;
use crate::record::{self, ParsedRecord};
use crate::sse::{self, StoredEvent};

/// Parse raw record JSON bytes into a [`MockResponse`].
///
/// `fallback_mock_id` is used when the record carries no `x-mock-id`
/// header.
pub fn parse_record_bytes(
    bytes: &[u8],
    fallback_mock_id: &str,
) -> Result<MockResponse, CodecError> {
    let doc: Value = serde_json::from_slice(bytes)?;
    parse_record_value(&doc, fallback_mock_id)
}

/// Parse an already-decoded record document into a [`MockResponse`].
pub fn parse_record_value(doc: &Value, fallback_mock_id: &str) -> Result<MockResponse, CodecError> {
    let parsed = record::parse(doc, fallback_mock_id)?;
    materialize(parsed)
}

fn materialize(parsed: ParsedRecord) -> Result<MockResponse, CodecError> {
    let ParsedRecord {
        request_id,
        method,
        full_url,
        path,
        mock_id,
        status_code,
        response_headers,
        content_type,
        response_body,
        delay,
        ..
    } = parsed;

    let is_gzip = response_headers
        .get("content-encoding")
        .map(|v| v.eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);

    // Attempt gzip decode first; on any failure, fall through to the
    // non-gzip cases using the original body value.
    let (effective_body, gzip_fallback_bytes) = if is_gzip {
        match response_body.as_str() {
            Some(encoded) => match try_gunzip_json(encoded) {
                Some(decoded) => (decoded, None),
                None => (
                    Value::Null,
                    Some(best_effort_base64_decode(encoded)),
                ),
            },
            None => (response_body.clone(), None),
        }
    } else {
        (response_body.clone(), None)
    };

    let is_sse = content_type == EVENT_STREAM_CONTENT_TYPE;

    let (body_bytes, sse_events) = if let Some(raw_bytes) = gzip_fallback_bytes {
        // Gzip decode failed entirely: the original base64 string survives
        // verbatim as the body.
        (raw_bytes, Vec::new())
    } else if is_sse {
        materialize_sse_body(&effective_body)
    } else {
        (serialize_plain_body(&effective_body), Vec::new())
    };

    Ok(MockResponse {
        path,
        full_url,
        method,
        mock_id,
        content_type,
        status_code,
        headers: response_headers,
        body_bytes,
        sse_events,
        is_sse,
        delay,
        request_id,
    })
}

/// Best-effort gzip: base64-decode then gunzip then JSON-parse, in that
/// order. Returns `None` on any failure in the chain.
fn try_gunzip_json(encoded: &str) -> Option<Value> {
    let compressed = BASE64.decode(encoded.trim()).ok()?;
    let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).ok()?;
    serde_json::from_slice(&decompressed).ok()
}

/// When gzip decoding fails outright, the original base64 string survives
/// as the body bytes: this is a best-effort decode, not a hard requirement.
fn best_effort_base64_decode(encoded: &str) -> Vec<u8> {
    encoded.as_bytes().to_vec()
}

/// Materialize an SSE body: either a sequence of `{data, timestamp}`
/// objects, or a pre-formatted string.
fn materialize_sse_body(body: &Value) -> (Vec<u8>, Vec<StoredEvent>) {
    match body {
        Value::Array(items) => {
            let events: Vec<StoredEvent> = items
                .iter()
                .filter_map(|item| {
                    let obj = item.as_object()?;
                    let data = obj.get("data")?;
                    let timestamp = obj.get("timestamp").and_then(Value::as_f64).unwrap_or(0.0);
                    Some(StoredEvent::from_json_data(data, timestamp))
                })
                .collect();
            let body_bytes = sse::concat_events(&events);
            (body_bytes, events)
        }
        Value::String(s) => (s.as_bytes().to_vec(), Vec::new()),
        other => (serialize_plain_body(other), Vec::new()),
    }
}

/// Serialize a plain (non-SSE, non-gzip) body: strings become UTF-8 bytes,
/// everything else is canonically re-serialized JSON.
fn serialize_plain_body(body: &Value) -> Vec<u8> {
    match body {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Null => Vec::new(),
        other => serde_json::to_vec(other).unwrap_or_default(),
    }
}

/// A fully-assembled record ready to be written to disk by the proxy.
pub struct RecordToWrite<'a> {
    /// Request method, as received.
    pub method: &'a str,
    /// Full request URL, as received.
    pub url: &'a str,
    /// Request headers, original case.
    pub request_headers: &'a HeaderMap,
    /// Parsed (or raw-string) request body.
    pub request_body: &'a Value,
    /// Response status code.
    pub status_code: u16,
    /// Response headers, original case.
    pub response_headers: &'a HeaderMap,
    /// Response body value (JSON value, SSE event array, or raw string).
    pub response_body: &'a Value,
    /// Total recorded delay, in seconds.
    pub delay: f64,
}

/// Generate a request id: a `yyyymmdd_hhmmss.microseconds`-style timestamp,
/// monotonically unique within a single process.
pub fn generate_request_id(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%Y%m%d_%H%M%S%.6f").to_string()
}

/// Build the on-disk JSON document for a record, suitable for
/// `serde_json::to_writer_pretty`.
pub fn build_record_document(request_id: &str, record: &RecordToWrite<'_>) -> Value {
    let mut request = Map::new();
    request.insert("request_id".to_string(), Value::String(request_id.to_string()));
    request.insert("method".to_string(), Value::String(record.method.to_string()));
    request.insert("url".to_string(), Value::String(record.url.to_string()));
    request.insert("headers".to_string(), header_map_to_json(record.request_headers));
    request.insert("body".to_string(), record.request_body.clone());

    let mut response = Map::new();
    response.insert(
        "status_code".to_string(),
        Value::Number(record.status_code.into()),
    );
    response.insert("headers".to_string(), header_map_to_json(record.response_headers));
    response.insert("body".to_string(), record.response_body.clone());
    response.insert(
        "delay".to_string(),
        serde_json::Number::from_f64(record.delay)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    );

    let mut root = Map::new();
    root.insert("request".to_string(), Value::Object(request));
    root.insert("response".to_string(), Value::Object(response));
    Value::Object(root)
}

fn header_map_to_json(headers: &HeaderMap) -> Value {
    let mut obj = Map::new();
    for (name, value) in headers.iter() {
        obj.insert(name.to_string(), Value::String(value.to_string()));
    }
    Value::Object(obj)
}

/// Sanitize a content-type into a filesystem-safe file-name fragment:
/// `/`, `+`, `.` become `_`, and SSE becomes the literal `text_event-stream`.
pub fn sanitize_content_type(content_type: &str) -> String {
    if content_type == EVENT_STREAM_CONTENT_TYPE {
        return "text_event-stream".to_string();
    }
    content_type
        .chars()
        .map(|c| match c {
            '/' | '+' | '.' => '_',
            other => other,
        })
        .collect()
}

/// Build the file name for a record write: `<sanitized_ct>_<yyyymmdd_hhmmss>_<4-byte-hex>.json`.
pub fn record_file_name(content_type: &str, now: chrono::DateTime<chrono::Utc>, rng: &mut impl Rng) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S");
    let mut suffix = [0u8; 4];
    rng.fill(&mut suffix);
    let hex: String = suffix.iter().map(|b| format!("{b:02x}")).collect();
    format!("{}_{}_{}.json", sanitize_content_type(content_type), stamp, hex)
}

/// Write a record document to `<log_dir>/<mock_id>/<file_name>` (mock
/// records) or `<log_dir>/<file_name>` when `mock_id` is `None` (404 logs
/// are written flat, with no per-mock-id subdirectory).
pub fn write_record_file(
    log_dir: &Path,
    mock_id: Option<&str>,
    file_name: &str,
    document: &Value,
) -> Result<PathBuf, CodecError> {
    let dir = match mock_id {
        Some(id) => log_dir.join(id),
        None => log_dir.to_path_buf(),
    };
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(file_name);
    let file = std::fs::File::create(&path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, document)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn materializes_plain_json_body() {
        let doc = json!({
            "request": {"url": "http://u/users/1", "method": "GET", "headers": {}},
            "response": {
                "status_code": 200,
                "headers": {"Content-Type": "application/json"},
                "body": {"id": 1, "name": "A"}
            }
        });
        let resp = parse_record_value(&doc, "default").unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.content_type, "application/json");
        assert!(!resp.is_sse);
        assert_eq!(resp.body_bytes, br#"{"id":1,"name":"A"}"#.to_vec());
    }

    #[test]
    fn materializes_sse_array_body_with_done_sentinel() {
        let doc = json!({
            "request": {"url": "http://u/stream", "method": "GET", "headers": {}},
            "response": {
                "status_code": 200,
                "headers": {"Content-Type": "text/event-stream"},
                "body": [
                    {"data": {"token": "hi"}, "timestamp": 0.1},
                    {"data": "[DONE]", "timestamp": 0.2}
                ],
                "delay": 0.2
            }
        });
        let resp = parse_record_value(&doc, "default").unwrap();
        assert!(resp.is_sse);
        assert_eq!(resp.sse_events.len(), 2);
        assert_eq!(resp.sse_events[1].serialized_data, b"[DONE]");
        assert!(resp.body_bytes.ends_with(b"data: [DONE]\n\n"));
    }

    #[test]
    fn gzip_decode_failure_preserves_base64_string() {
        let doc = json!({
            "request": {"url": "http://u/x", "method": "GET", "headers": {}},
            "response": {
                "status_code": 200,
                "headers": {"Content-Type": "application/json", "Content-Encoding": "gzip"},
                "body": "not-valid-base64-or-gzip!!"
            }
        });
        let resp = parse_record_value(&doc, "default").unwrap();
        assert_eq!(resp.body_bytes, b"not-valid-base64-or-gzip!!".to_vec());
    }

    #[test]
    fn sanitizes_content_type_for_file_names() {
        assert_eq!(sanitize_content_type("application/json"), "application_json");
        assert_eq!(sanitize_content_type("text/event-stream"), "text_event-stream");
        assert_eq!(sanitize_content_type("application/vnd.api+json"), "application_vnd_api_json");
    }
}
