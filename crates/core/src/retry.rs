//! Retry policy and backoff jitter (PRD-3).
//!
//! Waits between attempts use a fixed base with a uniform jitter band,
//! not exponential growth. [`RetryPolicy`] carries the per-scene retry
//! tunables consumed by the attempt controller.

use std::time::Duration;

use rand::Rng;

/// Fraction of the base wait used as the jitter band on each side.
///
/// A 22s base with the default fraction sleeps between 17.6s and 26.4s.
pub const JITTER_FRACTION: f64 = 0.2;

/// Tunables for a single scene's retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempt budget per scene; once a scene has failed this many
    /// attempts it is abandoned.
    pub max_retries_per_scene: u32,
    /// Number of failed attempts between failovers to the other session.
    /// `0` disables failover entirely.
    pub switch_after_retries: u32,
    /// Base wait between attempts, before jitter.
    pub base_wait: Duration,
    /// Upper bound on a single attempt, submission through outcome.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries_per_scene: 25,
            switch_after_retries: 1,
            base_wait: Duration::from_secs(22),
            attempt_timeout: Duration::from_secs(200),
        }
    }
}

/// Inclusive bounds of the jittered wait for a given base.
pub fn jitter_window(base: Duration, fraction: f64) -> (Duration, Duration) {
    let base_ms = base.as_millis() as u64;
    let band = (base_ms as f64 * fraction) as u64;
    (
        Duration::from_millis(base_ms.saturating_sub(band)),
        Duration::from_millis(base_ms + band),
    )
}

/// Sample a wait uniformly from the jitter window around `base`.
pub fn jittered_wait(base: Duration) -> Duration {
    let (lo, hi) = jitter_window(base, JITTER_FRACTION);
    if lo >= hi {
        return lo;
    }
    let ms = rand::rng().random_range(lo.as_millis() as u64..=hi.as_millis() as u64);
    Duration::from_millis(ms)
}
