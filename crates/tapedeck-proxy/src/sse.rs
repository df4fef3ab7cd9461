//! The proxy-side SSE recording pipeline.
//!
//! Tees an upstream `text/event-stream` body to the client byte-for-byte
//! while simultaneously parsing it line by line to extract `data: …` lines
//! into a timestamped event list, which is persisted as a record once the
//! stream ends (or is abandoned mid-flight on client disconnect).
//!
//! Rather than a hand-rolled chunked-transfer reader, this uses `reqwest`'s
//! own streaming body (`Response::bytes_stream`): `hyper` already de-chunks
//! `Transfer-Encoding: chunked` for us, so the byte chunks handed to the
//! line parser below are exactly the dechunked body a manual reader would
//! have had to reconstruct by hand.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap as AxumHeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use futures::StreamExt;
use serde_json::Value;
use tapedeck_core::headers::{is_hop_by_hop, HeaderMap};

use crate::app_state::AppState;
use crate::persist;

/// Forward one SSE request to the upstream, streaming the response to the
/// client while recording it.
pub async fn handle(
    state: &Arc<AppState>,
    method: Method,
    uri: Uri,
    headers: AxumHeaderMap,
    body: Bytes,
) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let url = state.upstream_url(path_and_query);

    let reqwest_method = match reqwest::Method::from_bytes(method.as_str().as_bytes()) {
        Ok(m) => m,
        Err(_) => return bad_gateway("invalid request method"),
    };

    let mut request_headers = HeaderMap::default();
    let mut upstream_request = state.client.request(reqwest_method, &url);
    for (name, value) in headers.iter() {
        if let Ok(value_str) = value.to_str() {
            request_headers.insert(name.as_str().to_string(), value_str.to_string());
            if !is_hop_by_hop(name.as_str()) {
                upstream_request = upstream_request.header(name.as_str(), value_str);
            }
        }
    }
    upstream_request = upstream_request.body(body.to_vec());

    // Dial, then immediately forward status + headers. Errors before any
    // response bytes arrive are surfaced to the client as 502.
    let upstream_response = match upstream_request.send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(%url, error = %err, "upstream SSE connection failed before any response bytes");
            return bad_gateway("upstream request failed");
        }
    };

    let status_code = upstream_response.status().as_u16();
    let mut response_headers = HeaderMap::default();
    for (name, value) in upstream_response.headers().iter() {
        if let Ok(value_str) = value.to_str() {
            response_headers.insert(name.as_str().to_string(), value_str.to_string());
        }
    }

    let mut client_headers = AxumHeaderMap::new();
    let mut saw_content_type = false;
    for (name, value) in response_headers.iter_replayable() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            if name == axum::http::header::CONTENT_TYPE {
                saw_content_type = true;
            }
            client_headers.append(name, value);
        }
    }
    if !saw_content_type {
        client_headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(tapedeck_core::content_type::EVENT_STREAM_CONTENT_TYPE),
        );
    }

    let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::BAD_GATEWAY);
    let request_body: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).to_string()))
    };

    let recorder = Recorder::new(
        state.log_dir.clone(),
        method.as_str().to_string(),
        url,
        request_headers,
        request_body,
        status_code,
        response_headers,
    );

    let mut upstream_bytes = upstream_response.bytes_stream();
    let stream = async_stream::stream! {
        let mut recorder = recorder;
        loop {
            match upstream_bytes.next().await {
                Some(Ok(chunk)) => {
                    recorder.feed(&chunk);
                    yield Ok::<Bytes, std::convert::Infallible>(chunk);
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "upstream SSE stream read failed mid-body");
                    break;
                }
                None => break,
            }
        }
        recorder.finish();
    };

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = client_headers;
    response
}

fn bad_gateway(message: &str) -> Response {
    let mut response = Response::new(Body::from(format!("{{\"error\":{message:?}}}")));
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    response
}

/// Accumulates `{data, timestamp}` events from a line-oriented SSE body
/// and persists them as a record, either when the stream ends normally
/// (`finish`) or when it is dropped early on client disconnect (`Drop`).
struct Recorder {
    log_dir: PathBuf,
    method: String,
    url: String,
    request_headers: HeaderMap,
    request_body: Value,
    status_code: u16,
    response_headers: HeaderMap,
    start: Instant,
    pending: Vec<u8>,
    current_event: Vec<u8>,
    events: Vec<(Value, f64)>,
    persisted: bool,
}

impl Recorder {
    #[allow(clippy::too_many_arguments)]
    fn new(
        log_dir: PathBuf,
        method: String,
        url: String,
        request_headers: HeaderMap,
        request_body: Value,
        status_code: u16,
        response_headers: HeaderMap,
    ) -> Self {
        Self {
            log_dir,
            method,
            url,
            request_headers,
            request_body,
            status_code,
            response_headers,
            start: Instant::now(),
            pending: Vec::new(),
            current_event: Vec::new(),
            events: Vec::new(),
            persisted: false,
        }
    }

    /// Feed one more chunk of the raw upstream body into the line parser.
    fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(newline_pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=newline_pos).collect();
            line.pop(); // drop the '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.handle_line(&line);
        }
    }

    fn handle_line(&mut self, line: &[u8]) {
        if line.is_empty() {
            if !self.current_event.is_empty() {
                self.extract_data_lines();
                self.current_event.clear();
            }
            return;
        }
        self.current_event.extend_from_slice(line);
        self.current_event.push(b'\n');
    }

    /// Scan the accumulated event's lines for `data: ` (or `data:`)
    /// prefixes, parsing each suffix as JSON with a raw-string fallback.
    fn extract_data_lines(&mut self) {
        let timestamp = self.start.elapsed().as_secs_f64();
        for line in self.current_event.split(|&b| b == b'\n') {
            let suffix = if let Some(rest) = line.strip_prefix(b"data: ") {
                rest
            } else if let Some(rest) = line.strip_prefix(b"data:") {
                rest
            } else {
                continue;
            };
            let text = String::from_utf8_lossy(suffix).to_string();
            let data = serde_json::from_str(&text).unwrap_or(Value::String(text));
            self.events.push((data, timestamp));
        }
    }

    /// Flush any trailing unterminated event (no final blank line before
    /// EOF) and persist the record. Idempotent: safe to call once from the
    /// normal end-of-stream path and a no-op from the subsequent `Drop`.
    fn finish(&mut self) {
        if self.persisted {
            return;
        }
        if !self.current_event.is_empty() {
            self.extract_data_lines();
            self.current_event.clear();
        }
        self.persist();
        self.persisted = true;
    }

    fn persist(&self) {
        let delay = self.start.elapsed().as_secs_f64();
        let response_body = Value::Array(
            self.events
                .iter()
                .map(|(data, ts)| {
                    serde_json::json!({"data": data, "timestamp": ts})
                })
                .collect(),
        );
        persist::write_record(
            &self.log_dir,
            &self.method,
            &self.url,
            &self.request_headers,
            &self.request_body,
            self.status_code,
            &self.response_headers,
            &response_body,
            delay,
        );
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // Errors during streaming are terminal but must still trigger
        // persistence of whatever events were collected so far. This also
        // covers a client disconnect, which drops the response stream
        // without reaching `finish`.
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_recorder() -> Recorder {
        Recorder::new(
            PathBuf::from("/tmp/does-not-matter"),
            "GET".to_string(),
            "http://u/stream".to_string(),
            HeaderMap::default(),
            Value::Null,
            200,
            HeaderMap::default(),
        )
    }

    #[test]
    fn extracts_data_lines_on_blank_line() {
        let mut recorder = new_recorder();
        recorder.feed(b"data: {\"token\":\"hi\"}\n\n");
        assert_eq!(recorder.events.len(), 1);
        assert_eq!(recorder.events[0].0, serde_json::json!({"token": "hi"}));
    }

    #[test]
    fn falls_back_to_raw_string_on_non_json_data() {
        let mut recorder = new_recorder();
        recorder.feed(b"data: not-json\n\n");
        assert_eq!(recorder.events.len(), 1);
        assert_eq!(recorder.events[0].0, Value::String("not-json".to_string()));
    }

    #[test]
    fn done_sentinel_round_trips_as_plain_string() {
        let mut recorder = new_recorder();
        recorder.feed(b"data: [DONE]\n\n");
        assert_eq!(recorder.events[0].0, Value::String("[DONE]".to_string()));
    }

    #[test]
    fn ignores_non_data_lines_within_an_event() {
        let mut recorder = new_recorder();
        recorder.feed(b"event: message\ndata: {\"a\":1}\nid: 5\n\n");
        assert_eq!(recorder.events.len(), 1);
    }

    #[test]
    fn handles_chunk_boundaries_splitting_a_line() {
        let mut recorder = new_recorder();
        recorder.feed(b"data: {\"a\"");
        recorder.feed(b":1}\n\n");
        assert_eq!(recorder.events.len(), 1);
        assert_eq!(recorder.events[0].0, serde_json::json!({"a": 1}));
    }

    #[test]
    fn finish_flushes_an_event_with_no_trailing_blank_line() {
        let mut recorder = new_recorder();
        recorder.feed(b"data: {\"a\":1}\n");
        assert!(recorder.events.is_empty());
        recorder.finish();
        assert_eq!(recorder.events.len(), 1);
    }

    #[test]
    fn finish_is_idempotent() {
        let mut recorder = new_recorder();
        recorder.feed(b"data: 1\n\n");
        recorder.finish();
        let count = recorder.events.len();
        recorder.finish();
        assert_eq!(recorder.events.len(), count);
    }
}
