//! Request dispatch: SSE requests go through the recording tee pipeline
//! (`sse::handle`), everything else through plain forwarding (`forward::forward`).
//!
//! Routing is a substring check against the whole `Accept` header value, not
//! an exact match, since clients commonly send a list such as
//! `text/event-stream, application/json`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap as AxumHeaderMap, Method, Uri};
use axum::response::Response;
use axum::Router;
use tapedeck_core::content_type::EVENT_STREAM_CONTENT_TYPE;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::{forward, sse};

/// Build the axum router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: AxumHeaderMap,
    body: Bytes,
) -> Response {
    let is_sse_request = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(EVENT_STREAM_CONTENT_TYPE));

    if is_sse_request {
        sse::handle(&state, method, uri, headers, body).await
    } else {
        forward::forward(&state, method, uri, headers, body).await
    }
}
