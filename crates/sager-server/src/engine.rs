//! The tracking engine task.
//!
//! Sole owner of the reconciler (and so of the track store) and the session
//! clock. Events are pulled from one queue and handled one at a time, in
//! arrival order; after each event the engine publishes a fresh snapshot.

use std::sync::Arc;

use chrono::Utc;
use sager_core::{
    ChangeSet, FleetStats, InMemoryTrackStore, RawReport, Reconciler, SessionClock, StreamEvent,
    TrackStore, TrackedEntity,
};
use tokio::sync::{broadcast, mpsc, watch};

use crate::state::{StreamMessage, TrackSnapshot};

#[derive(Debug)]
pub enum EngineEvent {
    /// One delivery from the transport.
    Batch(Vec<RawReport>),
    /// Session clock interval elapsed.
    Tick,
    /// Stop after the events already queued.
    Shutdown,
}

pub struct Engine {
    reconciler: Reconciler<InMemoryTrackStore>,
    clock: SessionClock,
    batches_processed: u64,
    snapshots: watch::Sender<Arc<TrackSnapshot>>,
    stream: broadcast::Sender<StreamMessage>,
}

impl Engine {
    pub fn new(
        snapshots: watch::Sender<Arc<TrackSnapshot>>,
        stream: broadcast::Sender<StreamMessage>,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(InMemoryTrackStore::new()),
            clock: SessionClock::new(),
            batches_processed: 0,
            snapshots,
            stream,
        }
    }

    pub async fn run(mut self, mut events: mpsc::Receiver<EngineEvent>) {
        tracing::info!("Tracking engine started");

        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Batch(batch) => {
                    self.apply_batch(batch);
                }
                EngineEvent::Tick => self.apply_tick(),
                EngineEvent::Shutdown => break,
            }
        }

        tracing::info!(
            tracked = self.reconciler.store().len(),
            batches = self.batches_processed,
            "Tracking engine stopped, releasing track store"
        );
    }

    pub fn apply_batch(&mut self, batch: Vec<RawReport>) -> ChangeSet {
        let reports = batch.len();
        // Still the pre-batch state: a snapshot is published after every event.
        let previous = self.snapshots.borrow().clone();
        let changes = self.reconciler.reconcile_at(batch, Utc::now());
        self.batches_processed += 1;

        for skipped in &changes.skipped {
            tracing::warn!(index = skipped.index, "Skipping report: {}", skipped.error);
        }
        tracing::debug!(
            reports,
            changed = changes.len(),
            skipped = changes.skipped.len(),
            "Reconciled batch"
        );

        self.publish_snapshot();
        if !changes.is_empty() || !changes.skipped.is_empty() {
            self.broadcast_changes(&changes, &previous);
        }
        changes
    }

    pub fn apply_tick(&mut self) {
        let elapsed_s = self.clock.tick();
        self.publish_snapshot();
        self.broadcast_fleet(&StreamEvent::Session {
            elapsed_s,
            elapsed: self.clock.display(),
        });
    }

    pub fn store(&self) -> &InMemoryTrackStore {
        self.reconciler.store()
    }

    fn publish_snapshot(&self) {
        let drones = self.reconciler.store().all();
        let snapshot = TrackSnapshot {
            stats: FleetStats::from_entities(&drones),
            drones,
            session_elapsed_s: self.clock.elapsed_ticks(),
            batches_processed: self.batches_processed,
            generated_at: Utc::now(),
        };
        self.snapshots.send_replace(Arc::new(snapshot));
    }

    fn broadcast_changes(&self, changes: &ChangeSet, previous: &TrackSnapshot) {
        for drone_id in changes.iter() {
            if let Some(drone) = self.reconciler.store().get(drone_id) {
                let was_authorized = previous.get(drone_id).map(|d| d.authorized);
                self.broadcast_update(drone, was_authorized);
            }
        }
        self.broadcast_fleet(&StreamEvent::Changes {
            changed: changes.iter().map(str::to_string).collect(),
            skipped: changes.skipped.len(),
        });
    }

    fn broadcast_update(&self, drone: &TrackedEntity, was_authorized: Option<bool>) {
        if let Some(payload) = encode(&StreamEvent::Update {
            drone: drone.clone(),
        }) {
            self.send(StreamMessage {
                drone_id: Some(drone.id.clone()),
                authorized: Some(drone.authorized),
                was_authorized,
                payload,
            });
        }
    }

    fn broadcast_fleet(&self, event: &StreamEvent) {
        if let Some(payload) = encode(event) {
            self.send(StreamMessage {
                drone_id: None,
                authorized: None,
                was_authorized: None,
                payload,
            });
        }
    }

    fn send(&self, message: StreamMessage) {
        // No subscribers is fine; nothing is rendering right now.
        let _ = self.stream.send(message);
    }
}

fn encode(event: &StreamEvent) -> Option<Arc<str>> {
    match serde_json::to_string(event) {
        Ok(payload) => Some(Arc::from(payload)),
        Err(e) => {
            tracing::error!("Failed to encode stream event: {}", e);
            None
        }
    }
}
