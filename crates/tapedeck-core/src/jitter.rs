//! Injectable randomness for delay/SSE jitter.
//!
//! The random-number source may be a process-global generator; its output
//! is not security-sensitive. Tests need to inject a deterministic source
//! to validate the jitter math exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform `[-1.0, 1.0]` draws for jitter computation.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// across request-handling tasks (typically behind a `parking_lot::Mutex`
/// at the call site, since `rand`'s generators require `&mut self`).
pub trait JitterSource: Send + Sync {
    /// Draw a value uniformly distributed in `[-1.0, 1.0]`.
    fn sample(&mut self) -> f64;
}

/// The default jitter source: thread-local `rand::rng()`, reseeded lazily
/// per the thread's entropy pool. Not deterministic; used in production.
#[derive(Default)]
pub struct ThreadRngSource;

impl JitterSource for ThreadRngSource {
    fn sample(&mut self) -> f64 {
        rand::rng().random_range(-1.0..=1.0)
    }
}

/// A deterministic jitter source seeded from a fixed value, for tests that
/// want to assert exact jitter math.
pub struct FixedSeedRngSource {
    rng: StdRng,
}

impl FixedSeedRngSource {
    /// Construct a source seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl JitterSource for FixedSeedRngSource {
    fn sample(&mut self) -> f64 {
        self.rng.random_range(-1.0..=1.0)
    }
}

/// A jitter source that always returns a fixed value, useful for asserting
/// exact scaled timestamps without depending on distribution behavior.
pub struct ConstantRngSource(pub f64);

impl JitterSource for ConstantRngSource {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Apply the multiplicative jitter formula `delay * (1 + jitter * draw)`,
/// clamped to non-negative.
pub fn jittered_delay(delay: f64, jitter: f64, draw: f64) -> f64 {
    (delay * (1.0 + jitter * draw)).max(0.0)
}

/// Compute the SSE jitter scale factor `1 + jitter * draw`, clamped to
/// `>= 0`.
pub fn jitter_scale(jitter: f64, draw: f64) -> f64 {
    (1.0 + jitter * draw).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_source_is_deterministic() {
        let mut src = ConstantRngSource(0.5);
        assert_eq!(src.sample(), 0.5);
        assert_eq!(src.sample(), 0.5);
    }

    #[test]
    fn jittered_delay_clamps_to_zero() {
        assert_eq!(jittered_delay(0.1, 1.0, -2.0), 0.0);
    }

    #[test]
    fn jittered_delay_bounds_match_jitter_fraction() {
        let delay = 1.0;
        let jitter = 0.1;
        let high = jittered_delay(delay, jitter, 1.0);
        let low = jittered_delay(delay, jitter, -1.0);
        assert!((high - 1.1).abs() < 1e-9);
        assert!((low - 0.9).abs() < 1e-9);
    }

    #[test]
    fn scale_never_negative() {
        assert_eq!(jitter_scale(1.0, -5.0), 0.0);
    }
}
