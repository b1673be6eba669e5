//! Property tests for the reconciliation engine over arbitrary batch sequences.

use std::collections::HashMap;

use proptest::prelude::*;
use sager_core::{
    is_authorized, Coordinate, InMemoryTrackStore, RawReport, Reconciler, TrackStore,
    MAX_PATH_LEN,
};

fn arb_report() -> impl Strategy<Value = RawReport> {
    (
        prop::option::weighted(0.9, 0usize..6),
        -180.0f64..180.0,
        -90.0f64..90.0,
        prop::sample::select(vec!["SD-B001", "SD-X002", "SD", "", "SD-B-7"]),
    )
        .prop_map(|(id, lon, lat, registration)| RawReport {
            id: id.map(|n| format!("D{}", n)),
            coordinates: Some(Coordinate::new(lon, lat)),
            registration: Some(registration.to_string()),
            ..RawReport::default()
        })
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<RawReport>>> {
    prop::collection::vec(prop::collection::vec(arb_report(), 0..8), 0..60)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn path_is_bounded_and_ends_at_latest_fix(batches in arb_batches()) {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        let mut latest: HashMap<String, Coordinate> = HashMap::new();

        for batch in batches {
            for report in &batch {
                if let (Some(id), Some(coord)) = (&report.id, report.coordinates) {
                    latest.insert(id.clone(), coord);
                }
            }
            engine.reconcile(batch);
        }

        prop_assert_eq!(engine.store().len(), latest.len());
        for entity in engine.store().all() {
            prop_assert!(!entity.path.is_empty());
            prop_assert!(entity.path.len() <= MAX_PATH_LEN);
            prop_assert_eq!(entity.path.last().copied(), latest.get(&entity.id).copied());
            prop_assert_eq!(Some(entity.position), latest.get(&entity.id).copied());
        }
    }

    #[test]
    fn flight_ticks_count_batches_after_first(batches in arb_batches()) {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        let mut batches_seen: HashMap<String, u64> = HashMap::new();

        for batch in batches {
            let mut ids: Vec<String> = batch.iter().filter_map(|r| r.id.clone()).collect();
            ids.sort();
            ids.dedup();
            for id in ids {
                *batches_seen.entry(id).or_insert(0) += 1;
            }
            engine.reconcile(batch);
        }

        for entity in engine.store().all() {
            let seen = batches_seen[&entity.id];
            prop_assert_eq!(entity.flight_time_ticks, seen.saturating_sub(1));
        }
    }

    #[test]
    fn changed_set_matches_identified_reports(batch in prop::collection::vec(arb_report(), 0..12)) {
        let mut engine = Reconciler::new(InMemoryTrackStore::new());
        let identified = batch.iter().filter(|r| r.id.is_some()).count();
        let expected: std::collections::BTreeSet<String> =
            batch.iter().filter_map(|r| r.id.clone()).collect();

        let changes = engine.reconcile(batch.clone());

        prop_assert_eq!(&changes.changed, &expected);
        prop_assert_eq!(changes.skipped.len(), batch.len() - identified);
    }

    #[test]
    fn classification_is_deterministic(code in "[A-Z]{0,3}(-[A-Za-z0-9]{0,5}){0,3}") {
        prop_assert_eq!(is_authorized(&code), is_authorized(&code));
        let expected = code.split('-').nth(1).map_or(false, |s| s.starts_with('B'));
        prop_assert_eq!(is_authorized(&code), expected);
    }
}
