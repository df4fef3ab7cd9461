//! The pooled SSE replay writer.
//!
//! A writer's only state is a reused scratch buffer for event encoding;
//! pacing and the actual streaming live in the handler (which needs to
//! `yield` into an `async_stream::stream!` generator, something a method
//! taking a sink closure cannot do). The pool exists purely to amortize
//! that buffer's allocation across requests, matching the
//! `parking_lot`-backed pooled/shared mutable state idiom used elsewhere
//! in this workspace.

use std::time::Duration;

use parking_lot::Mutex;
use tapedeck_core::sse::StoredEvent;
use tokio::time::Instant;

/// One pooled SSE writer.
#[derive(Default)]
pub struct SseWriter {
    scratch: Vec<u8>,
}

impl SseWriter {
    /// Encode one event into the writer's reused scratch buffer, returning
    /// an owned copy suitable for handing to the response body stream.
    pub fn encode_owned(&mut self, event: &StoredEvent) -> Vec<u8> {
        self.scratch.clear();
        self.scratch.extend_from_slice(b"data: ");
        self.scratch.extend_from_slice(&event.serialized_data);
        self.scratch.extend_from_slice(b"\n\n");
        self.scratch.clone()
    }
}

/// Compute the absolute instant at which `event` should be emitted,
/// relative to `start` (the moment streaming began, not when the request
/// was received). Returns `start` itself (i.e. "do not sleep") when the
/// target offset has already elapsed.
pub fn target_instant(start: Instant, event: &StoredEvent, jitter_scale: f64) -> Instant {
    let offset = (event.timestamp * jitter_scale).max(0.0);
    start + Duration::from_secs_f64(offset)
}

/// A simple free-list pool of [`SseWriter`]s.
pub struct SseWriterPool {
    writers: Mutex<Vec<SseWriter>>,
}

impl SseWriterPool {
    /// Construct an empty pool; writers are created on demand and kept
    /// after use.
    pub fn new() -> Self {
        Self {
            writers: Mutex::new(Vec::new()),
        }
    }

    /// Acquire a writer, reusing one from the pool when available.
    pub fn acquire(&self) -> SseWriter {
        self.writers.lock().pop().unwrap_or_default()
    }

    /// Return a writer to the pool for reuse. Called even after a stream
    /// ends via client disconnect — see `handler::PooledWriter`'s `Drop`
    /// impl.
    pub fn release(&self, writer: SseWriter) {
        self.writers.lock().push(writer);
    }
}

impl Default for SseWriterPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_owned_matches_wire_form() {
        let mut writer = SseWriter::default();
        let event = StoredEvent::from_json_data(&json!({"a": 1}), 0.0);
        assert_eq!(writer.encode_owned(&event), b"data: {\"a\":1}\n\n".to_vec());
    }

    #[test]
    fn encode_owned_reuses_scratch_across_calls() {
        let mut writer = SseWriter::default();
        let a = StoredEvent::from_json_data(&json!("a"), 0.0);
        let b = StoredEvent::from_json_data(&json!("bb"), 0.0);
        let first = writer.encode_owned(&a);
        let second = writer.encode_owned(&b);
        assert_eq!(first, b"data: \"a\"\n\n".to_vec());
        assert_eq!(second, b"data: \"bb\"\n\n".to_vec());
    }

    #[test]
    fn target_instant_applies_jitter_scale() {
        let start = Instant::now();
        let event = StoredEvent::from_json_data(&json!("x"), 0.2);
        let target = target_instant(start, &event, 2.0);
        assert!((target - start).as_secs_f64() - 0.4 < 1e-6);
    }

    #[test]
    fn pool_reuses_released_writers() {
        let pool = SseWriterPool::new();
        let writer = pool.acquire();
        pool.release(writer);
        assert_eq!(pool.writers.lock().len(), 1);
        let _writer = pool.acquire();
        assert_eq!(pool.writers.lock().len(), 0);
    }
}
