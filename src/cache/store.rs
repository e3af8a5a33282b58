//! LRU storage for rendered item views.

use std::sync::RwLock;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::invalidator::{CacheError, CacheInvalidator};
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";
const METRIC_CACHE_HIT_TOTAL: &str = "piazza_cache_hit_total";
const METRIC_CACHE_MISS_TOTAL: &str = "piazza_cache_miss_total";
const METRIC_CACHE_EVICT_TOTAL: &str = "piazza_cache_evict_total";
const METRIC_CACHE_INVALIDATE_TOTAL: &str = "piazza_cache_invalidate_total";

/// Bounded LRU map from [`CacheKey`] to a cached value.
///
/// A disabled store never holds entries: reads miss, writes are dropped and
/// invalidation succeeds without doing anything.
pub struct ViewStore<V> {
    enabled: bool,
    namespace: String,
    entries: RwLock<LruCache<CacheKey, V>>,
}

impl<V: Clone> ViewStore<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            namespace: config.namespace.clone(),
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        if !self.enabled {
            return None;
        }
        // LruCache::get updates recency, so even reads take the write lock.
        let found = rw_write(&self.entries, SOURCE, "get").get(key).cloned();
        if found.is_some() {
            counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
        } else {
            counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
        }
        found
    }

    /// Store `value`, returning the key evicted to make room, if any.
    pub fn set(&self, key: CacheKey, value: V) -> Option<CacheKey> {
        if !self.enabled {
            return None;
        }
        let replaced = key.clone();
        let evicted = rw_write(&self.entries, SOURCE, "set")
            .push(key, value)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != replaced);
        if let Some(evicted_key) = evicted.as_ref() {
            counter!(METRIC_CACHE_EVICT_TOTAL).increment(1);
            debug!(
                target = "cache::store",
                key = %evicted_key,
                "Evicted least recently used entry"
            );
        }
        evicted
    }

    /// Remove `key`, returning whether an entry was present.
    pub fn remove(&self, key: &CacheKey) -> bool {
        if !self.enabled {
            return false;
        }
        let removed = rw_write(&self.entries, SOURCE, "remove").pop(key).is_some();
        counter!(METRIC_CACHE_INVALIDATE_TOTAL).increment(1);
        removed
    }

    /// Get the number of cached entries.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<V> CacheInvalidator for ViewStore<V>
where
    V: Clone + Send + Sync,
{
    async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        if key.namespace != self.namespace {
            return Err(CacheError::ForeignNamespace {
                expected: self.namespace.clone(),
                found: key.namespace.clone(),
            });
        }
        let removed = self.remove(key);
        debug!(
            target = "cache::store",
            key = %key,
            removed,
            "Invalidated cache entry"
        );
        Ok(())
    }
}
