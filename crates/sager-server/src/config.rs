//! Server configuration from environment.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Upstream WebSocket feed of report batches. HTTP ingest only when unset.
    pub feed_url: Option<String>,
    /// Session clock interval.
    pub tick_interval: Duration,
    /// Capacity of the engine's inbound event queue.
    pub event_queue: usize,
    /// Per-client buffer of the change stream before updates are dropped.
    pub stream_capacity: usize,
    pub feed_backoff_base: Duration,
    pub feed_backoff_max: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 9013,
            feed_url: None,
            tick_interval: Duration::from_millis(1000),
            event_queue: 256,
            stream_capacity: 1024,
            feed_backoff_base: Duration::from_millis(500),
            feed_backoff_max: Duration::from_millis(30_000),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_env("SAGER_PORT").unwrap_or(defaults.server_port),
            feed_url: env::var("SAGER_FEED_URL")
                .ok()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            tick_interval: parse_env("SAGER_TICK_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            event_queue: parse_env("SAGER_EVENT_QUEUE")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.event_queue),
            stream_capacity: parse_env("SAGER_STREAM_CAPACITY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.stream_capacity),
            feed_backoff_base: parse_env("SAGER_FEED_BACKOFF_BASE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.feed_backoff_base),
            feed_backoff_max: parse_env("SAGER_FEED_BACKOFF_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.feed_backoff_max),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
