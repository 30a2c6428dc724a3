//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::{CacheConfig, ResponseCache};
use crate::snapshot::SnapshotHolder;

use super::dto::{AlternativesResponse, ConnectionResponse};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Current network, bike and delay data
    pub snapshots: Arc<SnapshotHolder>,

    /// Connection and range responses
    pub connections: Arc<ResponseCache<ConnectionResponse>>,

    /// Alternative trip responses
    pub alternatives: Arc<ResponseCache<AlternativesResponse>>,
}

impl AppState {
    pub fn new(snapshots: Arc<SnapshotHolder>, cache: &CacheConfig) -> Self {
        Self {
            snapshots,
            connections: Arc::new(ResponseCache::new(cache)),
            alternatives: Arc::new(ResponseCache::new(cache)),
        }
    }
}
