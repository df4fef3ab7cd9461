//! Plain (non-SSE) upstream forwarding: a straightforward HTTP client call
//! wrapped around the record writer. No timing pipeline of its own — that
//! only matters for SSE replay, handled separately in `sse`.

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap as AxumHeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use serde_json::Value;
use tapedeck_core::content_type::DEFAULT_CONTENT_TYPE;
use tapedeck_core::headers::{is_hop_by_hop, HeaderMap};

use crate::app_state::AppState;
use crate::persist;

/// Forward one non-SSE request to the upstream, persist the exchange, and
/// relay the upstream's response back to the client.
pub async fn forward(
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

    let start = Instant::now();
    let upstream_response = match upstream_request.send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(%url, error = %err, "upstream request failed before any response bytes");
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

    let body_bytes = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(%url, error = %err, "failed reading upstream response body");
            return bad_gateway("upstream response body read failed");
        }
    };
    let delay = start.elapsed().as_secs_f64();

    let request_body: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).to_string()))
    };
    let response_body: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).to_string()))
    };

    persist::write_record(
        &state.log_dir,
        method.as_str(),
        &url,
        &request_headers,
        &request_body,
        status_code,
        &response_headers,
        &response_body,
        delay,
    );

    let mut response_builder = Response::builder().status(status_code);
    if let Some(map) = response_builder.headers_mut() {
        let mut saw_content_type = false;
        for (name, value) in response_headers.iter_replayable() {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                if name == axum::http::header::CONTENT_TYPE {
                    saw_content_type = true;
                }
                map.append(name, value);
            }
        }
        if !saw_content_type {
            map.insert(
                axum::http::header::CONTENT_TYPE,
                HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            );
        }
    }

    response_builder
        .body(Body::from(body_bytes))
        .unwrap_or_else(|_| bad_gateway("failed to build client response"))
}

fn bad_gateway(message: &str) -> Response {
    let mut response = Response::new(Body::from(format!("{{\"error\":{message:?}}}")));
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    response
}
