//! Caching layer for search responses.
//!
//! A response depends only on the request and on the snapshot it ran
//! against, so entries are keyed by the serialized request plus the snapshot
//! generation. Publishing a new snapshot makes every older entry
//! unreachable; the TTL then drops them.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use serde::Serialize;

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_capacity: 1000,
        }
    }
}

/// Cache key: endpoint, canonical request JSON and snapshot generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: &'static str,
    request: String,
    generation: u64,
}

impl CacheKey {
    pub fn new(
        endpoint: &'static str,
        request: &impl Serialize,
        generation: u64,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            endpoint,
            request: serde_json::to_string(request)?,
            generation,
        })
    }
}

/// Cache of responses of type `V`.
pub struct ResponseCache<V> {
    entries: MokaCache<CacheKey, Arc<V>>,
}

impl<V> ResponseCache<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();
        Self { entries }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.entries.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, value: Arc<V>) {
        self.entries.insert(key, value).await;
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{ConnectionRequest, Place};
    use chrono::NaiveDate;

    fn request(destination: &str) -> ConnectionRequest {
        let at = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        ConnectionRequest::new(Place::stop("Alpha"), Place::stop(destination), at)
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.max_capacity, 1000);
    }

    #[test]
    fn keys_separate_requests_and_generations() {
        let a = CacheKey::new("connection", &request("Beta"), 1).unwrap();
        assert_eq!(a, CacheKey::new("connection", &request("Beta"), 1).unwrap());
        assert_ne!(a, CacheKey::new("connection", &request("Gamma"), 1).unwrap());
        assert_ne!(a, CacheKey::new("connection", &request("Beta"), 2).unwrap());
        assert_ne!(a, CacheKey::new("range", &request("Beta"), 1).unwrap());
    }

    #[tokio::test]
    async fn stores_and_returns_entries() {
        let cache: ResponseCache<String> = ResponseCache::new(&CacheConfig::default());
        let key = CacheKey::new("connection", &request("Beta"), 0).unwrap();
        assert!(cache.get(&key).await.is_none());

        cache.insert(key.clone(), Arc::new("found".to_string())).await;
        assert_eq!(cache.get(&key).await.as_deref().map(String::as_str), Some("found"));

        let newer = CacheKey::new("connection", &request("Beta"), 1).unwrap();
        assert!(cache.get(&newer).await.is_none());
    }
}
