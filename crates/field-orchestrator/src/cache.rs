//! In-memory LRU cache of generated fields.
//!
//! Keyed by source (URL or canonical file path). An entry holds everything
//! needed to republish a field without refetching or regenerating it, so a
//! second orchestrator pointed at the same source replays the stored result.

use std::num::NonZeroUsize;
use std::sync::Arc;

use field_common::Field;
use field_renderer::MeshRasterResult;
use lru::LruCache;
use once_cell::sync::OnceCell;
use tokio::sync::RwLock;

/// A generated field ready to be republished.
#[derive(Clone, Debug)]
pub struct CachedField {
    /// Queryable field built from the normalized grid.
    pub field: Field,
    /// Mesh and raster generated from the same grid.
    pub mesh: Arc<MeshRasterResult>,
}

impl CachedField {
    pub fn new(field: Field, mesh: Arc<MeshRasterResult>) -> Self {
        Self { field, mesh }
    }

    fn texel_bytes(&self) -> u64 {
        self.mesh.velocity.len() as u64
    }
}

/// Statistics for the result cache.
#[derive(Debug, Default, Clone)]
pub struct ResultCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
    pub raster_bytes_cached: u64,
}

impl ResultCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// LRU cache of generated fields shared by every orchestrator that holds it.
pub struct ResultCache {
    cache: Arc<RwLock<LruCache<String, CachedField>>>,
    stats: Arc<RwLock<ResultCacheStats>>,
    capacity: usize,
}

static SHARED: OnceCell<Arc<ResultCache>> = OnceCell::new();

impl ResultCache {
    /// Create a new cache holding at most `capacity` fields.
    pub fn new(capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Arc::new(RwLock::new(LruCache::new(size))),
            stats: Arc::new(RwLock::new(ResultCacheStats::default())),
            capacity: size.get(),
        }
    }

    /// Process-wide cache, created with `capacity` on first use.
    ///
    /// Later calls return the same instance regardless of `capacity`.
    pub fn shared(capacity: usize) -> Arc<ResultCache> {
        SHARED
            .get_or_init(|| Arc::new(ResultCache::new(capacity)))
            .clone()
    }

    /// Look up a generated field, promoting it to most recently used.
    pub async fn get(&self, key: &str) -> Option<CachedField> {
        let mut cache = self.cache.write().await;
        let mut stats = self.stats.write().await;

        match cache.get(key) {
            Some(entry) => {
                stats.hits += 1;
                metrics::counter!("field_cache_hits_total").increment(1);
                Some(entry.clone())
            }
            None => {
                stats.misses += 1;
                metrics::counter!("field_cache_misses_total").increment(1);
                None
            }
        }
    }

    /// Store a generated field, evicting the least recently used entry when full.
    pub async fn insert(&self, key: String, entry: CachedField) {
        let mut cache = self.cache.write().await;
        let added = entry.texel_bytes();

        let evicted = cache.push(key.clone(), entry);

        let mut stats = self.stats.write().await;
        stats.raster_bytes_cached += added;
        if let Some((old_key, old)) = evicted {
            stats.raster_bytes_cached = stats.raster_bytes_cached.saturating_sub(old.texel_bytes());
            if old_key != key {
                stats.evictions += 1;
            }
        }
        stats.entries = cache.len();
    }

    /// Whether `key` is cached, without touching recency or stats.
    pub async fn contains(&self, key: &str) -> bool {
        self.cache.read().await.contains(key)
    }

    /// Remove one entry.
    pub async fn remove(&self, key: &str) -> Option<CachedField> {
        let mut cache = self.cache.write().await;
        let removed = cache.pop(key);

        let mut stats = self.stats.write().await;
        if let Some(entry) = &removed {
            stats.raster_bytes_cached = stats.raster_bytes_cached.saturating_sub(entry.texel_bytes());
        }
        stats.entries = cache.len();
        removed
    }

    /// Get current cache statistics.
    pub async fn stats(&self) -> ResultCacheStats {
        let cache = self.cache.read().await;
        let mut stats = self.stats.write().await;
        stats.entries = cache.len();
        stats.clone()
    }

    /// Clear the cache and reset statistics.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();

        let mut stats = self.stats.write().await;
        *stats = ResultCacheStats::default();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}
