//! Shared state handed to every request handler.

use parking_lot::Mutex;
use tapedeck_core::jitter::{JitterSource, ThreadRngSource};
use tapedeck_core::{Index, ScenarioSet};

use crate::logging404::Logger404;
use crate::replay::SseWriterPool;

/// Which routing strategy serves a request: the scenario matcher, when
/// `-mock-config` is set, otherwise the header-based index. The two are
/// mutually exclusive for a given server instance.
pub enum Routing {
    /// Header-based `(path, mock_id, content_type, method)` lookup.
    Index(Index),
    /// Declaration-ordered, JSON-body-predicate scenario matching.
    Scenario(ScenarioSet),
}

/// Timing-replay configuration applied uniformly to SSE and non-SSE bodies.
#[derive(Debug, Clone, Copy)]
pub struct ReplayConfig {
    /// Whether delay/jitter replay is active at all.
    pub enabled: bool,
    /// Multiplicative jitter range in `[0, 1]`.
    pub jitter: f64,
}

/// Application state shared across all request handlers via `Arc`.
pub struct AppState {
    /// The active routing strategy.
    pub routing: Routing,
    /// Delay/jitter replay configuration.
    pub replay: ReplayConfig,
    /// Shared jitter RNG, mutex-guarded so concurrent readers don't race
    /// on the underlying generator state.
    pub jitter_source: Mutex<Box<dyn JitterSource>>,
    /// Pool of reusable SSE writers.
    pub sse_pool: SseWriterPool,
    /// Optional 404 request/response logger.
    pub logger404: Option<Logger404>,
}

impl AppState {
    /// Build application state from a loaded routing strategy and the
    /// remaining CLI-derived configuration.
    pub fn new(routing: Routing, replay: ReplayConfig, logger404: Option<Logger404>) -> Self {
        Self {
            routing,
            replay,
            jitter_source: Mutex::new(Box::new(ThreadRngSource)),
            sse_pool: SseWriterPool::new(),
            logger404,
        }
    }

    /// Draw one jitter sample in `[-1.0, 1.0]`.
    pub fn draw_jitter(&self) -> f64 {
        self.jitter_source.lock().sample()
    }
}
