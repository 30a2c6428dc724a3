//! The currently published network/bike/delay data.
//!
//! Searches clone the `Arc<Snapshot>` once at their start and keep using it
//! to the end, so a refresh never changes data under a running search.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::bikes::BikeModel;
use crate::delay::DelayModel;
use crate::network::TransitModel;

/// One consistent view of all search inputs.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub network: Arc<TransitModel>,
    pub bikes: Arc<BikeModel>,
    pub delays: Arc<DelayModel>,
    /// Increases with every published replacement.
    pub generation: u64,
}

impl Snapshot {
    pub fn new(network: TransitModel, bikes: BikeModel, delays: DelayModel) -> Self {
        Self {
            network: Arc::new(network),
            bikes: Arc::new(bikes),
            delays: Arc::new(delays),
            generation: 0,
        }
    }
}

/// Holder of the current [`Snapshot`], swapped wholesale on refresh.
///
/// The lock is held only to clone or replace the `Arc`.
#[derive(Debug, Default)]
pub struct SnapshotHolder {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotHolder {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot to run a request against.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish a new network together with the bike model linked to it.
    pub fn replace_network(&self, network: TransitModel, bikes: BikeModel) -> u64 {
        self.publish(|old| Snapshot {
            network: Arc::new(network),
            bikes: Arc::new(bikes),
            delays: old.delays.clone(),
            generation: old.generation + 1,
        })
    }

    pub fn replace_delays(&self, delays: DelayModel) -> u64 {
        self.publish(|old| Snapshot {
            delays: Arc::new(delays),
            generation: old.generation + 1,
            ..old.clone()
        })
    }

    pub fn replace_bikes(&self, bikes: BikeModel) -> u64 {
        self.publish(|old| Snapshot {
            bikes: Arc::new(bikes),
            generation: old.generation + 1,
            ..old.clone()
        })
    }

    fn publish(&self, next: impl FnOnce(&Snapshot) -> Snapshot) -> u64 {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let snapshot = next(&current);
        let generation = snapshot.generation;
        *current = Arc::new(snapshot);
        info!(generation, "published new snapshot");
        generation
    }
}
