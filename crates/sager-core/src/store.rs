//! Track store: tracked drones keyed by identifier.

use std::collections::HashMap;

use crate::models::TrackedEntity;

/// Storage for tracked drones. Merge logic lives in the reconciler; a store
/// only replaces whole entities.
pub trait TrackStore {
    fn get(&self, id: &str) -> Option<&TrackedEntity>;

    /// Insert the entity, replacing any entity with the same id.
    fn upsert(&mut self, entity: TrackedEntity);

    /// Snapshot of every tracked drone.
    fn all(&self) -> Vec<TrackedEntity>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime store backed by a `HashMap`. Entities are never evicted.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTrackStore {
    drones: HashMap<String, TrackedEntity>,
}

impl InMemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackStore for InMemoryTrackStore {
    fn get(&self, id: &str) -> Option<&TrackedEntity> {
        self.drones.get(id)
    }

    fn upsert(&mut self, entity: TrackedEntity) {
        self.drones.insert(entity.id.clone(), entity);
    }

    /// Sorted by id so consecutive snapshots list drones in the same order.
    fn all(&self) -> Vec<TrackedEntity> {
        let mut drones: Vec<TrackedEntity> = self.drones.values().cloned().collect();
        drones.sort_by(|a, b| a.id.cmp(&b.id));
        drones
    }

    fn len(&self) -> usize {
        self.drones.len()
    }
}
