//! Shared, read-mostly application state handed to every request handler.
//!
//! Handlers never touch the track store. They read the latest
//! [`TrackSnapshot`] published by the engine and hand batches to the engine
//! through its event queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sager_core::{FeedStatus, FleetStats, RawReport, StatsReport, TrackedEntity};
use tokio::sync::{broadcast, mpsc, watch};

use crate::config::Config;
use crate::engine::EngineEvent;

/// Immutable view of the store after one engine event.
#[derive(Debug, Clone)]
pub struct TrackSnapshot {
    /// Sorted by drone id.
    pub drones: Vec<TrackedEntity>,
    pub stats: FleetStats,
    pub session_elapsed_s: u64,
    pub batches_processed: u64,
    pub generated_at: DateTime<Utc>,
}

impl Default for TrackSnapshot {
    fn default() -> Self {
        Self {
            drones: Vec::new(),
            stats: FleetStats::default(),
            session_elapsed_s: 0,
            batches_processed: 0,
            generated_at: Utc::now(),
        }
    }
}

impl TrackSnapshot {
    pub fn get(&self, drone_id: &str) -> Option<&TrackedEntity> {
        self.drones
            .binary_search_by(|d| d.id.as_str().cmp(drone_id))
            .ok()
            .map(|idx| &self.drones[idx])
    }

    pub fn stats_report(&self) -> StatsReport {
        StatsReport::new(self.stats, self.session_elapsed_s)
    }
}

/// A pre-serialized frame for `/v1/stream` clients.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// Set for per-drone frames so clients can filter without parsing.
    pub drone_id: Option<String>,
    pub authorized: Option<bool>,
    /// Classification before this batch, when the drone was already tracked.
    pub was_authorized: Option<bool>,
    pub payload: Arc<str>,
}

impl StreamMessage {
    /// Whether a client filtering on `class` should see this message.
    ///
    /// Fleet-wide frames always pass. A drone update passes when the drone
    /// held `class` before or after the batch, so a drone leaving the class
    /// still reaches clients watching it.
    pub fn touches_class(&self, class: bool) -> bool {
        match self.authorized {
            None => true,
            Some(now) => now == class || self.was_authorized == Some(class),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("tracking engine has shut down")]
pub struct EngineClosed;

/// Application state: channels into and out of the engine task.
pub struct AppState {
    config: Config,
    events: mpsc::Sender<EngineEvent>,
    snapshots: watch::Receiver<Arc<TrackSnapshot>>,
    feed_status: watch::Receiver<FeedStatus>,
    pub tx: broadcast::Sender<StreamMessage>,
}

impl AppState {
    pub fn new(
        config: Config,
        events: mpsc::Sender<EngineEvent>,
        snapshots: watch::Receiver<Arc<TrackSnapshot>>,
        feed_status: watch::Receiver<FeedStatus>,
        tx: broadcast::Sender<StreamMessage>,
    ) -> Self {
        Self {
            config,
            events,
            snapshots,
            feed_status,
            tx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<TrackSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes on every new snapshot.
    pub fn watch_snapshots(&self) -> watch::Receiver<Arc<TrackSnapshot>> {
        self.snapshots.clone()
    }

    pub fn feed_status(&self) -> FeedStatus {
        self.feed_status.borrow().clone()
    }

    /// Queue a batch behind any batches already waiting.
    pub async fn submit_batch(&self, batch: Vec<RawReport>) -> Result<(), EngineClosed> {
        self.events
            .send(EngineEvent::Batch(batch))
            .await
            .map_err(|_| EngineClosed)
    }
}
