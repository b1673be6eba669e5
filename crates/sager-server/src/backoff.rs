//! Reconnect backoff for the upstream feed: doubling delay with jitter.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

const JITTER_RATIO: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            current: base,
        }
    }

    /// Call after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.base;
    }

    /// Delay before the next attempt. Doubles on every call up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = with_jitter(self.current);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

fn with_jitter(delay: Duration) -> Duration {
    let jitter_max_ms = (delay.as_millis() as f64 * JITTER_RATIO) as u64;
    if jitter_max_ms == 0 {
        return delay;
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    delay + Duration::from_millis(nanos % (jitter_max_ms + 1))
}
