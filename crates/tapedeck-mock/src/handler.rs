//! The three-route mock server surface: `/__mock__/stats`,
//! `/__mock__/list`, and the catch-all mock lookup.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap as AxumHeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::Value;
use tapedeck_core::content_type::{self, DEFAULT_CONTENT_TYPE};
use tapedeck_core::jitter;
use tapedeck_core::record::MOCK_ID_HEADER;
use tapedeck_core::MockResponse;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::app_state::{AppState, Routing};
use crate::replay::{target_instant, SseWriter};

/// Build the axum router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/__mock__/stats", get(stats_handler))
        .route("/__mock__/list", get(list_handler))
        .fallback(mock_lookup_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Response {
    let body = match &state.routing {
        Routing::Index(index) => index.stats_json().to_vec(),
        Routing::Scenario(scenarios) => scenarios.stats_json().to_vec(),
    };
    json_response(StatusCode::OK, body)
}

async fn list_handler(State(state): State<Arc<AppState>>) -> Response {
    let body = match &state.routing {
        Routing::Index(index) => index.list_json().to_vec(),
        Routing::Scenario(scenarios) => scenarios.list_json().to_vec(),
    };
    json_response(StatusCode::OK, body)
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
    );
    response
}

async fn mock_lookup_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: AxumHeaderMap,
    body: Bytes,
) -> Response {
    let mock_id = headers
        .get(MOCK_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("default")
        .to_string();
    let span = tracing::info_span!(
        "mock_lookup",
        path = %uri.path(),
        method = %method,
        mock_id = %mock_id,
        status = tracing::field::Empty,
    );
    let response = do_mock_lookup(state, method, uri, headers, body)
        .instrument(span.clone())
        .await;
    span.record("status", response.status().as_u16());
    response
}

/// Runs the lookup-then-serve logic under the `mock_lookup` span set up by
/// the caller, which tags the span with the final status code so operators
/// can correlate requests across the stats/list endpoints by
/// `mock_id`/`path`.
async fn do_mock_lookup(
    state: Arc<AppState>,
    method: Method,
    uri: Uri,
    headers: AxumHeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path();
    let method_str = method.as_str();

    let found = match &state.routing {
        Routing::Scenario(scenarios) => {
            let body_json: Option<Value> = if body.is_empty() {
                None
            } else {
                serde_json::from_slice(&body).ok()
            };
            scenarios.match_request(path, method_str, body_json.as_ref())
        }
        Routing::Index(index) => {
            let mock_id = headers
                .get(MOCK_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .unwrap_or("default");
            let accept = headers.get(axum::http::header::ACCEPT).and_then(|v| v.to_str().ok());
            match accept {
                None | Some("") => index.find(path, mock_id, DEFAULT_CONTENT_TYPE, method_str),
                Some("*/*") => index.find_any_content_type(path, mock_id, method_str),
                Some(other) => {
                    let first = other.split(',').next().unwrap_or(other);
                    let normalized = content_type::normalize(first);
                    index.find(path, mock_id, &normalized, method_str)
                }
            }
        }
    };

    match found {
        Some(response) => serve_hit(&state, response).await,
        None => serve_miss(&state, &method, &uri, &headers, &body).await,
    }
}

async fn serve_hit(state: &Arc<AppState>, found: &MockResponse) -> Response {
    if state.replay.enabled && !found.is_sse && found.delay > 0.0 {
        let draw = state.draw_jitter();
        let effective = jitter::jittered_delay(found.delay, state.replay.jitter, draw);
        if effective > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(effective)).await;
        }
    }

    let mut response_headers = AxumHeaderMap::new();
    let mut saw_content_type = false;
    for (name, value) in found.headers.iter_replayable() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            if name == axum::http::header::CONTENT_TYPE {
                saw_content_type = true;
            }
            response_headers.append(name, value);
        }
    }
    if !saw_content_type {
        let ct = if found.content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            found.content_type.as_str()
        };
        if let Ok(value) = HeaderValue::from_str(ct) {
            response_headers.insert(axum::http::header::CONTENT_TYPE, value);
        }
    }

    let status =
        StatusCode::from_u16(found.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if found.is_sse && !found.sse_events.is_empty() {
        if !state.replay.enabled {
            let mut response = Response::new(Body::from(found.body_bytes.clone()));
            *response.status_mut() = status;
            *response.headers_mut() = response_headers;
            return response;
        }

        let draw = state.draw_jitter();
        let jitter_scale = jitter::jitter_scale(state.replay.jitter, draw);
        let events = found.sse_events.clone();
        let state_for_stream = Arc::clone(state);

        let stream = async_stream::stream! {
            let mut guard = PooledWriter::acquire(&state_for_stream);
            let start = tokio::time::Instant::now();
            for event in &events {
                let target = target_instant(start, event, jitter_scale);
                let now = tokio::time::Instant::now();
                if target > now {
                    tokio::time::sleep_until(target).await;
                }
                let bytes = guard.encode(event);
                yield Ok::<Bytes, std::convert::Infallible>(Bytes::from(bytes));
            }
        };

        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        return response;
    }

    let mut response = Response::new(Body::from(found.body_bytes.clone()));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

async fn serve_miss(
    state: &Arc<AppState>,
    method: &Method,
    uri: &Uri,
    headers: &AxumHeaderMap,
    body: &Bytes,
) -> Response {
    if let Some(logger) = &state.logger404 {
        let accept_first = headers
            .get(axum::http::header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let mut request_headers = tapedeck_core::headers::HeaderMap::default();
        for (name, value) in headers.iter() {
            if let Ok(value_str) = value.to_str() {
                request_headers.insert(name.as_str().to_string(), value_str.to_string());
            }
        }
        let request_body: Value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(body).to_string())
            })
        };

        logger.log(
            method.as_str(),
            &uri.to_string(),
            &request_headers,
            &request_body,
            accept_first,
        );
    }

    json_response(
        StatusCode::NOT_FOUND,
        br#"{"error":"No mock found"}"#.to_vec(),
    )
}

/// RAII guard that returns a pooled [`SseWriter`] to its pool even if the
/// stream future is dropped mid-emission (client disconnect).
struct PooledWriter {
    state: Arc<AppState>,
    writer: Option<SseWriter>,
}

impl PooledWriter {
    fn acquire(state: &Arc<AppState>) -> Self {
        Self {
            state: Arc::clone(state),
            writer: Some(state.sse_pool.acquire()),
        }
    }

    fn encode(&mut self, event: &tapedeck_core::sse::StoredEvent) -> Vec<u8> {
        self.writer
            .as_mut()
            .expect("writer present for lifetime of guard")
            .encode_owned(event)
    }
}

impl Drop for PooledWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            self.state.sse_pool.release(writer);
        }
    }
}

impl IntoResponse for crate::error::MockError {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(format!("{{\"error\":{:?}}}", self.to_string())));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    }
}
