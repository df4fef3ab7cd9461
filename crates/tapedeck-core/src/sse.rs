//! The SSE event model shared by the replay writer (`tapedeck-mock`) and the
//! recorder (`tapedeck-proxy`).
//!
//! This is a pure, no-I/O model: encoding a stored event to the
//! `data: ...\n\n` wire form, and serializing a `data` JSON value with the
//! `[DONE]` sentinel emitted unquoted.

use serde_json::Value;

/// One stored SSE event: the already-JSON-encoded `data` payload and its
/// timestamp in seconds relative to stream start.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// The exact bytes to place after `data: ` on the wire.
    pub serialized_data: Vec<u8>,
    /// Seconds since the first byte of the response.
    pub timestamp: f64,
}

impl StoredEvent {
    /// Build a [`StoredEvent`] from a decoded `data` JSON value, applying
    /// the `[DONE]` sentinel rule: the literal string `"[DONE]"` is emitted
    /// as the bare bytes `[DONE]`, everything else is JSON-serialized.
    pub fn from_json_data(data: &Value, timestamp: f64) -> Self {
        let serialized_data = serialize_data(data);
        Self {
            serialized_data,
            timestamp,
        }
    }

    /// Encode this event to its wire form: `data: <bytes>\n\n`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_data.len() + 8);
        out.extend_from_slice(b"data: ");
        out.extend_from_slice(&self.serialized_data);
        out.extend_from_slice(b"\n\n");
        out
    }
}

/// Serialize a `data` JSON value, applying the `[DONE]` sentinel rule.
pub fn serialize_data(data: &Value) -> Vec<u8> {
    if let Value::String(s) = data {
        if s == "[DONE]" {
            return b"[DONE]".to_vec();
        }
    }
    serde_json::to_vec(data).unwrap_or_else(|_| b"null".to_vec())
}

/// Rescale every event's timestamp by `scale`, in place. Used for scenario
/// delay-override rescaling at load time; per-request jitter scaling
/// happens at read time instead, by scaling the target instant rather than
/// mutating the stored events (see `tapedeck-mock::replay`).
pub fn rescale_timestamps(events: &mut [StoredEvent], scale: f64) {
    for event in events {
        event.timestamp *= scale;
    }
}

/// Concatenate a full event list into the buffered `body_bytes` form used
/// when timing replay is off.
pub fn concat_events(events: &[StoredEvent]) -> Vec<u8> {
    let mut out = Vec::new();
    for event in events {
        out.extend_from_slice(&event.encode());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn done_sentinel_is_unquoted() {
        let data = json!("[DONE]");
        assert_eq!(serialize_data(&data), b"[DONE]");
    }

    #[test]
    fn regular_strings_are_quoted_json() {
        let data = json!("hello");
        assert_eq!(serialize_data(&data), b"\"hello\"");
    }

    #[test]
    fn objects_serialize_as_json() {
        let data = json!({"id": 1});
        assert_eq!(serialize_data(&data), br#"{"id":1}"#);
    }

    #[test]
    fn encode_wraps_with_data_prefix_and_blank_line() {
        let event = StoredEvent::from_json_data(&json!({"a": 1}), 0.1);
        assert_eq!(event.encode(), b"data: {\"a\":1}\n\n".to_vec());
    }

    #[test]
    fn rescale_preserves_relative_spacing() {
        let mut events = vec![
            StoredEvent::from_json_data(&json!("a"), 0.1),
            StoredEvent::from_json_data(&json!("b"), 0.5),
        ];
        rescale_timestamps(&mut events, 2.0);
        assert!((events[0].timestamp - 0.2).abs() < 1e-9);
        assert!((events[1].timestamp - 1.0).abs() < 1e-9);
    }
}
