//! Common time helpers for drain_core.
use std::time::{Duration, Instant};

/// Convert a configured millisecond count into a `Duration`, clamped to at
/// least 1 ms so periodic timers never spin.
#[inline]
pub fn period_from_ms(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

/// Milliseconds from `earlier` to `later`, saturating at 0.
#[inline]
pub fn ms_between(earlier: Instant, later: Instant) -> u64 {
    let ms = later.saturating_duration_since(earlier).as_millis();
    u64::try_from(ms).unwrap_or(u64::MAX)
}
