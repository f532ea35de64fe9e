use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::engine::ComponentSearch;
use super::models::{SearchHit, SearchQuery};
use crate::core::error::Result;

pub struct SearchCache<T> {
    cache: Mutex<LruCache<String, (T, Instant)>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub hit_rate: f64,
}

impl<T> SearchCache<T> {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl: Duration::from_secs(ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        let mut cache = self.cache.lock();
        if let Some((value, timestamp)) = cache.get(key) {
            if timestamp.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(value.clone());
            }
            cache.pop(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn set(&self, key: &str, value: T) {
        let mut cache = self.cache.lock();
        cache.put(key.to_string(), (value, Instant::now()));
    }

    /// Every field of the query participates in the key.
    pub fn make_key(query: &SearchQuery) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.text.as_bytes());
        hasher.update(query.top_k.to_le_bytes());
        if let Some(category) = &query.category {
            hasher.update(b"category");
            hasher.update(category.as_bytes());
        }
        if let Some(range) = &query.cost_range {
            hasher.update(b"cost");
            hasher.update(range.min.to_le_bytes());
            hasher.update(range.max.to_le_bytes());
        }
        if let Some(quality) = query.quality {
            hasher.update(b"quality");
            hasher.update(<&'static str>::from(quality).as_bytes());
        }
        hasher.update(query.min_similarity.to_le_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };
        let cache = self.cache.lock();

        CacheStats {
            hits,
            misses,
            size: cache.len(),
            hit_rate,
        }
    }

    pub fn clear(&self) {
        let mut cache = self.cache.lock();
        cache.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}


/// Memoizes ranked results of the wrapped search. Errors are not cached.
pub struct CachedSearch {
    inner: Arc<dyn ComponentSearch>,
    cache: SearchCache<Vec<SearchHit>>,
}

impl CachedSearch {
    pub fn new(inner: Arc<dyn ComponentSearch>, capacity: usize, ttl_secs: u64) -> Self {
        Self {
            inner,
            cache: SearchCache::new(capacity, ttl_secs),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl ComponentSearch for CachedSearch {
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let key = SearchCache::<Vec<SearchHit>>::make_key(query);
        if let Some(hits) = self.cache.get(&key) {
            debug!("Search cache hit for '{}'", crate::safe_truncate(&query.text, 50));
            return Ok(hits);
        }

        let hits = self.inner.search(query)?;
        self.cache.set(&key, hits.clone());
        Ok(hits)
    }
}
