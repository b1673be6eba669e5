//! Reconciliation engine: merges report batches into the track store.
//!
//! Every report in a batch is derived from the store as it stood before the
//! batch, so a drone reported twice in one batch is counted as one sighting
//! and the later report wins. Reports are independent: a rejected report is
//! recorded in the [`ChangeSet`] and the rest of the batch still applies.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{RawReport, ReportError, Sighting, TrackedEntity};
use crate::store::{InMemoryTrackStore, TrackStore};
use crate::wire::decode_payload;

/// A report left out of a batch, by its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedReport {
    pub index: usize,
    pub error: ReportError,
}

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Drones created or updated by the batch.
    pub changed: BTreeSet<String>,
    pub skipped: Vec<SkippedReport>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.changed.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }
}

/// Owns the track store and is its only writer.
#[derive(Debug, Default)]
pub struct Reconciler<S = InMemoryTrackStore> {
    store: S,
}

impl<S: TrackStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read-only view for snapshots.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn reconcile<I>(&mut self, batch: I) -> ChangeSet
    where
        I: IntoIterator<Item = RawReport>,
    {
        self.reconcile_at(batch, Utc::now())
    }

    /// Decode a feed payload and reconcile it.
    pub fn reconcile_payload(&mut self, payload: &Value) -> ChangeSet {
        self.reconcile(decode_payload(payload))
    }

    /// Merge a batch, stamping every update with `seen_at`.
    pub fn reconcile_at<I>(&mut self, batch: I, seen_at: DateTime<Utc>) -> ChangeSet
    where
        I: IntoIterator<Item = RawReport>,
    {
        let mut changes = ChangeSet::default();
        let mut staged: HashMap<String, TrackedEntity> = HashMap::new();

        for (index, report) in batch.into_iter().enumerate() {
            let sighting = match Sighting::try_from(report) {
                Ok(sighting) => sighting,
                Err(error) => {
                    changes.skipped.push(SkippedReport { index, error });
                    continue;
                }
            };

            let entity = match self.store.get(&sighting.id) {
                Some(existing) => {
                    let mut entity = existing.clone();
                    entity.update(sighting, seen_at);
                    entity
                }
                None => TrackedEntity::from_sighting(sighting, seen_at),
            };

            changes.changed.insert(entity.id.clone());
            staged.insert(entity.id.clone(), entity);
        }

        for entity in staged.into_values() {
            self.store.upsert(entity);
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, MAX_PATH_LEN};
    use chrono::TimeZone;

    fn report(id: &str, lon: f64, lat: f64, registration: &str) -> RawReport {
        RawReport {
            id: Some(id.to_string()),
            coordinates: Some(Coordinate::new(lon, lat)),
            registration: Some(registration.to_string()),
            ..RawReport::default()
        }
    }

    #[test]
    fn test_first_then_second_sighting() {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());

        let changes = engine.reconcile(vec![report("A1", 35.0, 31.0, "SD-B001")]);
        assert_eq!(changes.changed, BTreeSet::from(["A1".to_string()]));

        let a1 = engine.store().get("A1").unwrap();
        assert_eq!(engine.store().len(), 1);
        assert_eq!(a1.flight_time_ticks, 0);
        assert!(a1.authorized);
        assert_eq!(a1.path, vec![Coordinate::new(35.0, 31.0)]);

        let changes = engine.reconcile(vec![report("A1", 35.1, 31.1, "SD-B001")]);
        assert_eq!(changes.changed, BTreeSet::from(["A1".to_string()]));

        let a1 = engine.store().get("A1").unwrap();
        assert_eq!(a1.flight_time_ticks, 1);
        assert_eq!(
            a1.path,
            vec![Coordinate::new(35.0, 31.0), Coordinate::new(35.1, 31.1)]
        );
        assert_eq!(a1.position, Coordinate::new(35.1, 31.1));
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        engine.reconcile(vec![report("A1", 35.0, 31.0, "SD-B001")]);
        let before = engine.store().all();

        let changes = engine.reconcile(Vec::<RawReport>::new());
        assert!(changes.is_empty());
        assert!(changes.skipped.is_empty());
        assert_eq!(engine.store().all(), before);
    }

    #[test]
    fn test_bad_report_does_not_block_batch() {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        let mut no_id = report("ignored", 1.0, 1.0, "SD-B001");
        no_id.id = None;

        let changes = engine.reconcile(vec![
            report("A1", 35.0, 31.0, "SD-B001"),
            no_id,
            report("B2", 35.2, 31.2, "SD-X002"),
        ]);

        assert_eq!(changes.len(), 2);
        assert!(changes.contains("A1"));
        assert!(changes.contains("B2"));
        assert_eq!(
            changes.skipped,
            vec![SkippedReport {
                index: 1,
                error: ReportError::MissingIdentifier
            }]
        );
        assert_eq!(engine.store().len(), 2);
    }

    #[test]
    fn test_duplicate_id_in_batch_last_write_wins() {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        engine.reconcile(vec![report("A1", 35.0, 31.0, "SD-B001")]);

        let changes = engine.reconcile(vec![
            report("A1", 35.1, 31.1, "SD-B001"),
            report("A1", 35.2, 31.2, "SD-X001"),
        ]);
        assert_eq!(changes.len(), 1);

        let a1 = engine.store().get("A1").unwrap();
        assert_eq!(a1.flight_time_ticks, 1);
        assert!(!a1.authorized);
        assert_eq!(
            a1.path,
            vec![Coordinate::new(35.0, 31.0), Coordinate::new(35.2, 31.2)]
        );
    }

    #[test]
    fn test_full_path_drops_oldest() {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        for i in 0..MAX_PATH_LEN {
            engine.reconcile(vec![report("A1", i as f64, 0.0, "SD-B001")]);
        }
        let a1 = engine.store().get("A1").unwrap();
        assert_eq!(a1.path.len(), MAX_PATH_LEN);
        assert_eq!(a1.path[0], Coordinate::new(0.0, 0.0));

        engine.reconcile(vec![report("A1", 99.0, 0.0, "SD-B001")]);
        let a1 = engine.store().get("A1").unwrap();
        assert_eq!(a1.path.len(), MAX_PATH_LEN);
        assert_eq!(a1.path[0], Coordinate::new(1.0, 0.0));
        assert_eq!(a1.path.last(), Some(&Coordinate::new(99.0, 0.0)));
    }

    #[test]
    fn test_thirty_point_path_grows_to_thirty_one() {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        for i in 0..30 {
            engine.reconcile(vec![report("A1", i as f64, 0.0, "SD-B001")]);
        }
        engine.reconcile(vec![report("A1", 30.0, 0.0, "SD-B001")]);

        let a1 = engine.store().get("A1").unwrap();
        assert_eq!(a1.path.len(), 31);
        assert_eq!(a1.path[0], Coordinate::new(0.0, 0.0));
    }

    #[test]
    fn test_absent_drone_is_retained() {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        engine.reconcile(vec![report("A1", 35.0, 31.0, "SD-B001")]);
        let changes = engine.reconcile(vec![report("B2", 35.5, 31.5, "SD-B002")]);

        assert!(!changes.contains("A1"));
        assert_eq!(engine.store().get("A1").unwrap().flight_time_ticks, 0);
        assert_eq!(engine.store().len(), 2);
    }

    #[test]
    fn test_last_seen_uses_batch_time() {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        let seen_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        engine.reconcile_at(vec![report("A1", 35.0, 31.0, "SD-B001")], seen_at);
        assert_eq!(engine.store().get("A1").unwrap().last_seen, seen_at);
    }

    #[test]
    fn test_reconcile_payload() {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        let payload = serde_json::json!({
            "features": [
                {
                    "properties": { "serial": "SD-0009", "registration": "SD-B0009", "pilot": "Omar" },
                    "geometry": { "coordinates": [35.93, 31.95] }
                }
            ]
        });

        let changes = engine.reconcile_payload(&payload);
        assert!(changes.contains("SD-0009"));
        let drone = engine.store().get("SD-0009").unwrap();
        assert!(drone.authorized);
        assert_eq!(drone.details.pilot.as_deref(), Some("Omar"));
    }
}
