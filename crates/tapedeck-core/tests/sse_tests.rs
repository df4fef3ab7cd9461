//! SSE materialization and rescaling across the codec/sse boundary.

use tapedeck_core::codec::parse_record_value;
use serde_json::json;

#[test]
fn sse_record_round_trips_through_materialize() {
    let doc = json!({
        "request": {"url": "http://u/chat/stream", "method": "POST", "headers": {}},
        "response": {
            "status_code": 200,
            "headers": {"Content-Type": "text/event-stream"},
            "body": [
                {"data": {"token": "hi"}, "timestamp": 0.0},
                {"data": {"token": "there"}, "timestamp": 0.2},
                {"data": "[DONE]", "timestamp": 0.4}
            ],
            "delay": 0.4
        }
    });

    let resp = parse_record_value(&doc, "default").unwrap();
    assert!(resp.is_sse);
    assert!(resp.has_timed_sse_events());
    assert_eq!(resp.sse_events.len(), 3);
    assert_eq!(resp.sse_events[0].timestamp, 0.0);
    assert_eq!(resp.sse_events[2].serialized_data, b"[DONE]");

    let body = String::from_utf8(resp.body_bytes).unwrap();
    assert!(body.contains("data: {\"token\":\"hi\"}\n\n"));
    assert!(body.ends_with("data: [DONE]\n\n"));
}

#[test]
fn sse_string_body_has_no_timed_events() {
    let doc = json!({
        "request": {"url": "http://u/stream", "method": "GET", "headers": {}},
        "response": {
            "status_code": 200,
            "headers": {"Content-Type": "text/event-stream"},
            "body": "data: raw\n\n"
        }
    });
    let resp = parse_record_value(&doc, "default").unwrap();
    assert!(resp.is_sse);
    assert!(!resp.has_timed_sse_events());
    assert_eq!(resp.body_bytes, b"data: raw\n\n".to_vec());
}
