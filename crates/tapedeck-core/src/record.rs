//! Parsing the on-disk record JSON into a generic tree. Body materialization
//! lives in [`crate::codec`] since it needs the parsed pieces from here
//! plus gzip/base64 handling.

use serde_json::Value;
use url::Url;

use crate::content_type::{self, DEFAULT_CONTENT_TYPE};
use crate::error::CodecError;
use crate::headers::HeaderMap;

/// The header name used to pin a record to an explicit mock-id.
pub const MOCK_ID_HEADER: &str = "x-mock-id";

/// The parsed, not-yet-materialized shape of a record file: everything
/// [`crate::codec::parse_record_bytes`] needs before it decides how to
/// build `body_bytes`/`sse_events`.
pub struct ParsedRecord {
    /// `request.request_id`, if present.
    pub request_id: Option<String>,
    /// Upper-cased request method.
    pub method: String,
    /// Full request URL as recorded (used for `full_url` projections).
    pub full_url: String,
    /// URL path component only; `/` if the URL has none.
    pub path: String,
    /// Request headers, case preserved.
    pub request_headers: HeaderMap,
    /// Resolved mock-id: the `x-mock-id` request header if present and
    /// non-empty, otherwise the caller-supplied fallback.
    pub mock_id: String,
    /// HTTP status code from `response.status_code`.
    pub status_code: u16,
    /// Response headers, case preserved.
    pub response_headers: HeaderMap,
    /// Normalized content-type (parameters stripped, defaulted).
    pub content_type: String,
    /// The raw, not-yet-materialized response body value.
    pub response_body: Value,
    /// Resolved delay in seconds: `response.delay`, else legacy
    /// `response.elapsed_seconds`, else `0.0`.
    pub delay: f64,
}

/// Parse the top-level JSON document into a [`ParsedRecord`].
///
/// `fallback_mock_id` is used when the record has no `x-mock-id` header
/// (the mock directory name, or the scenario name, depending on caller).
pub fn parse(doc: &Value, fallback_mock_id: &str) -> Result<ParsedRecord, CodecError> {
    let root = doc.as_object().ok_or_else(|| CodecError::InvalidRecord {
        reason: "top-level document is not a JSON object".to_string(),
    })?;

    let request = root
        .get("request")
        .and_then(Value::as_object)
        .ok_or_else(|| CodecError::InvalidRecord {
            reason: "missing or non-object `request`".to_string(),
        })?;
    let response = root
        .get("response")
        .and_then(Value::as_object)
        .ok_or_else(|| CodecError::InvalidRecord {
            reason: "missing or non-object `response`".to_string(),
        })?;

    let request_id = request
        .get("request_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("GET")
        .to_ascii_uppercase();

    let full_url = request
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let path = extract_path(&full_url)?;

    let request_headers = request
        .get("headers")
        .and_then(Value::as_object)
        .map(HeaderMap::from_json_object)
        .unwrap_or_default();

    let mock_id = request_headers
        .get(MOCK_ID_HEADER)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_mock_id.to_string());

    let status_code = response
        .get("status_code")
        .and_then(Value::as_u64)
        .unwrap_or(200) as u16;

    let response_headers = response
        .get("headers")
        .and_then(Value::as_object)
        .map(HeaderMap::from_json_object)
        .unwrap_or_default();

    let content_type = response_headers
        .get("content-type")
        .map(content_type::normalize)
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let response_body = response.get("body").cloned().unwrap_or(Value::Null);

    let delay = response
        .get("delay")
        .and_then(Value::as_f64)
        .or_else(|| response.get("elapsed_seconds").and_then(Value::as_f64))
        .unwrap_or(0.0);

    Ok(ParsedRecord {
        request_id,
        method,
        full_url,
        path,
        request_headers,
        mock_id,
        status_code,
        response_headers,
        content_type,
        response_body,
        delay,
    })
}

/// Extract the path component of a URL, defaulting to `/` when absent or
/// unparseable enough to not contain one. Query, scheme, and host are
/// discarded.
pub fn extract_path(raw_url: &str) -> Result<String, CodecError> {
    if raw_url.is_empty() {
        return Ok("/".to_string());
    }
    match Url::parse(raw_url) {
        Ok(url) => {
            let path = url.path();
            Ok(if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            })
        }
        Err(_) => {
            // Not an absolute URL (e.g. the proxy recorded a bare path).
            // Treat the string itself as the path, taking only what precedes
            // any query string.
            let path = raw_url.split('?').next().unwrap_or(raw_url);
            Ok(if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_missing_request_or_response() {
        let doc = json!({"request": {}});
        let err = parse(&doc, "default").unwrap_err();
        assert!(matches!(err, CodecError::InvalidRecord { .. }));
    }

    #[test]
    fn extracts_path_discarding_query_and_host() {
        assert_eq!(extract_path("http://u/users/1?x=1").unwrap(), "/users/1");
        assert_eq!(extract_path("http://u/").unwrap(), "/");
        assert_eq!(extract_path("http://u").unwrap(), "/");
        assert_eq!(extract_path("").unwrap(), "/");
    }

    #[test]
    fn resolves_mock_id_from_header_then_fallback() {
        let doc = json!({
            "request": {"url": "http://u/x", "method": "GET", "headers": {"x-mock-id": "custom"}},
            "response": {"status_code": 200, "headers": {}, "body": {}}
        });
        let parsed = parse(&doc, "default").unwrap();
        assert_eq!(parsed.mock_id, "custom");

        let doc_no_header = json!({
            "request": {"url": "http://u/x", "method": "GET", "headers": {}},
            "response": {"status_code": 200, "headers": {}, "body": {}}
        });
        let parsed2 = parse(&doc_no_header, "default").unwrap();
        assert_eq!(parsed2.mock_id, "default");
    }

    #[test]
    fn legacy_elapsed_seconds_is_delay_synonym() {
        let doc = json!({
            "request": {"url": "http://u/x", "method": "GET", "headers": {}},
            "response": {"status_code": 200, "headers": {}, "body": {}, "elapsed_seconds": 1.5}
        });
        let parsed = parse(&doc, "default").unwrap();
        assert!((parsed.delay - 1.5).abs() < 1e-9);
    }

    #[test]
    fn delay_takes_precedence_over_elapsed_seconds() {
        let doc = json!({
            "request": {"url": "http://u/x", "method": "GET", "headers": {}},
            "response": {"status_code": 200, "headers": {}, "body": {}, "delay": 2.0, "elapsed_seconds": 1.5}
        });
        let parsed = parse(&doc, "default").unwrap();
        assert!((parsed.delay - 2.0).abs() < 1e-9);
    }
}
