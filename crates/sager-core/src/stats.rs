//! Aggregate readouts over a store snapshot.

use serde::{Deserialize, Serialize};

use crate::models::TrackedEntity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total: usize,
    pub authorized: usize,
    pub unauthorized: usize,
}

impl FleetStats {
    pub fn from_entities<'a, I>(entities: I) -> Self
    where
        I: IntoIterator<Item = &'a TrackedEntity>,
    {
        entities
            .into_iter()
            .fold(Self::default(), |mut stats, entity| {
                stats.total += 1;
                if entity.authorized {
                    stats.authorized += 1;
                } else {
                    stats.unauthorized += 1;
                }
                stats
            })
    }
}
