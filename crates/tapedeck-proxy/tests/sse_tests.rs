//! End-to-end coverage of the proxy's SSE recording pipeline.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tapedeck_proxy::app_state::AppState;
use tapedeck_proxy::router::router;

/// Spin up a tiny upstream that streams a fixed SSE body with a short
/// delay between chunks, so the proxy observes it arriving over multiple
/// `bytes_stream` polls rather than as one chunk.
async fn spawn_sse_upstream() -> std::net::SocketAddr {
    async fn stream_handler() -> Response {
        let chunks: Vec<&'static [u8]> = vec![
            b"data: {\"token\":\"hi\"}\n\n",
            b"data: {\"token\":\"there\"}\n\n",
            b"data: [DONE]\n\n",
        ];
        let stream = async_stream::stream! {
            for chunk in chunks {
                tokio::time::sleep(Duration::from_millis(5)).await;
                yield Ok::<_, std::convert::Infallible>(axum::body::Bytes::from_static(chunk));
            }
        };
        let mut response = Response::new(Body::from_stream(stream));
        response.headers_mut().insert(
            "content-type",
            axum::http::HeaderValue::from_static("text/event-stream"),
        );
        response
    }

    let app = Router::new().route("/stream", get(stream_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn sse_request_is_relayed_and_persisted() {
    let upstream_addr = spawn_sse_upstream().await;
    let log_dir = tempfile::tempdir().unwrap();

    let client = reqwest::Client::new();
    let state = Arc::new(AppState::new(
        format!("http://{upstream_addr}"),
        client,
        log_dir.path().to_path_buf(),
    ));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{proxy_addr}/stream"))
        .header("accept", "text/event-stream")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("data: {\"token\":\"hi\"}\n\n"));
    assert!(body.contains("data: [DONE]\n\n"));

    // Persistence happens as the response stream is dropped after the
    // client finishes reading it; give the drop a moment to run.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let default_dir = log_dir.path().join("default");
    let files: Vec<_> = std::fs::read_dir(&default_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(files.len(), 1);

    let contents = std::fs::read_to_string(files[0].path()).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(doc["response"]["status_code"], 200);
    let events = doc["response"]["body"].as_array().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["data"], serde_json::json!({"token": "hi"}));
    assert_eq!(events[2]["data"], "[DONE]");
}

#[tokio::test]
async fn non_sse_request_forwards_and_persists_plain_body() {
    async fn json_handler() -> axum::Json<serde_json::Value> {
        axum::Json(serde_json::json!({"id": 1, "name": "A"}))
    }
    let app = Router::new().route("/users/1", get(json_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let log_dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();
    let state = Arc::new(AppState::new(
        format!("http://{upstream_addr}"),
        client,
        log_dir.path().to_path_buf(),
    ));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{proxy_addr}/users/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"id": 1, "name": "A"}));

    let default_dir = log_dir.path().join("default");
    let files: Vec<_> = std::fs::read_dir(&default_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(files.len(), 1);
}
