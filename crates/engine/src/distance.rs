//! Destination ranking.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use autoorganize_inventory::Container;

/// Orders candidate destinations for a source; `Less` means "closer".
///
/// Implementations must be total and deterministic. Ties should fall back to
/// registration order so plans stay reproducible.
pub trait DistanceMetric: Send + Sync {
    fn compare(&self, source: &Container, a: &Container, b: &Container) -> Ordering;
}

/// Closeness in registration order: containers registered right before or
/// after the source rank first. Ties go to the earlier registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistrationProximity;

impl DistanceMetric for RegistrationProximity {
    fn compare(&self, source: &Container, a: &Container, b: &Container) -> Ordering {
        let origin = source.registration_seq();
        origin
            .abs_diff(a.registration_seq())
            .cmp(&origin.abs_diff(b.registration_seq()))
            .then_with(|| a.registration_seq().cmp(&b.registration_seq()))
    }
}

/// Manhattan block distance from the source. Other worlds rank last.
/// Ties go to the earlier registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockDistance;

impl DistanceMetric for BlockDistance {
    fn compare(&self, source: &Container, a: &Container, b: &Container) -> Ordering {
        let da = source.location().manhattan_distance(a.location());
        let db = source.location().manhattan_distance(b.location());
        let key = |d: Option<u64>| d.unwrap_or(u64::MAX);
        key(da)
            .cmp(&key(db))
            .then_with(|| a.registration_seq().cmp(&b.registration_seq()))
    }
}

/// Ranking selected in configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    #[default]
    Registration,
    BlockDistance,
}

impl Ranking {
    pub fn metric(self) -> Box<dyn DistanceMetric> {
        match self {
            Ranking::Registration => Box::new(RegistrationProximity),
            Ranking::BlockDistance => Box::new(BlockDistance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoorganize_core::LocationKey;
    use autoorganize_inventory::ContainerRegistry;

    fn registry(points: &[(i32, i32)]) -> ContainerRegistry {
        let mut registry = ContainerRegistry::default();
        for (x, z) in points {
            registry
                .register(LocationKey::new("world", *x, 64, *z), None, None, 27)
                .unwrap();
        }
        registry
    }

    fn ranked(metric: &dyn DistanceMetric, registry: &ContainerRegistry, source: usize) -> Vec<u64> {
        let all: Vec<&Container> = registry.iter().collect();
        let origin = all[source];
        let mut others: Vec<&Container> = all
            .iter()
            .copied()
            .filter(|c| c.location() != origin.location())
            .collect();
        others.sort_by(|a, b| metric.compare(origin, a, b));
        others.iter().map(|c| c.registration_seq()).collect()
    }

    #[test]
    fn registration_proximity_prefers_neighbours_then_earlier() {
        let registry = registry(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)]);
        assert_eq!(ranked(&RegistrationProximity, &registry, 2), vec![1, 3, 0, 4]);
    }

    #[test]
    fn block_distance_uses_coordinates() {
        let registry = registry(&[(0, 0), (50, 0), (3, 4), (-2, 0)]);
        assert_eq!(ranked(&BlockDistance, &registry, 0), vec![3, 2, 1]);
    }
}
