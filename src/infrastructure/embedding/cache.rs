//! Bounded LRU cache in front of an embedding provider

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;

use crate::domain::{DomainError, EmbeddingProvider};

/// Default number of cached embeddings
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Hit/miss counters for the embedding cache
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Fraction of lookups served from the cache (0.0-1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// LRU entries plus a generation bumped by every `clear`
struct Entries {
    lru: LruCache<String, Arc<[f32]>>,
    generation: u64,
}

enum Lookup {
    Hit(Arc<[f32]>),
    Miss { generation: u64 },
}

/// Memoizes text to embedding lookups with least-recently-used eviction.
///
/// Every lookup, insert, promotion and eviction happens inside one critical section
/// on the inner mutex; the lock is never held while the provider runs. Two callers
/// missing on the same text may both call the provider, but only the first to finish
/// inserts; the second finds the entry and promotes it instead. A result whose
/// lookup started before a `clear` is returned to its caller but not cached.
pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    entries: Mutex<Entries>,
    stats: CacheStats,
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("provider", &self.provider)
            .field("capacity", &self.capacity())
            .field("stats", &self.stats)
            .finish()
    }
}

impl EmbeddingCache {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, capacity: NonZeroUsize) -> Self {
        Self {
            provider,
            entries: Mutex::new(Entries {
                lru: LruCache::new(capacity),
                generation: 0,
            }),
            stats: CacheStats::default(),
        }
    }

    /// Create a cache holding up to `DEFAULT_CACHE_SIZE` embeddings
    pub fn with_default_capacity(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self::new(provider, capacity)
    }

    /// Embedding for `text`, from the cache or the provider.
    ///
    /// Provider failures are returned unchanged and nothing is cached for them.
    pub async fn get(&self, text: &str) -> Result<Arc<[f32]>, DomainError> {
        let generation = match self.lookup(text)? {
            Lookup::Hit(hit) => {
                self.stats.record_hit();
                tracing::debug!(text_len = text.len(), "Embedding cache hit");
                return Ok(hit);
            }
            Lookup::Miss { generation } => generation,
        };

        self.stats.record_miss();
        tracing::debug!(
            text_len = text.len(),
            provider = self.provider.provider_name(),
            "Embedding cache miss"
        );

        let vector = self.provider.embed(text).await?;
        self.check_dimensions(&vector)?;

        self.insert_or_promote(text, Arc::from(vector), generation)
    }

    /// Drop every entry; later lookups are misses.
    ///
    /// Lookups already waiting on the provider still return their result, but do
    /// not re-insert it.
    pub fn clear(&self) -> Result<(), DomainError> {
        let mut entries = self.lock()?;
        entries.lru.clear();
        entries.generation = entries.generation.wrapping_add(1);
        Ok(())
    }

    /// Number of cached embeddings
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.lru.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached embeddings
    pub fn capacity(&self) -> usize {
        self.lock()
            .map(|entries| entries.lru.cap().get())
            .unwrap_or(0)
    }

    /// Whether `text` is cached, without promoting it
    pub fn contains(&self, text: &str) -> bool {
        self.lock()
            .map(|entries| entries.lru.contains(text))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, DomainError> {
        self.entries
            .lock()
            .map_err(|e| DomainError::internal(format!("Embedding cache lock poisoned: {}", e)))
    }

    fn lookup(&self, text: &str) -> Result<Lookup, DomainError> {
        let mut guard = self.lock()?;
        let entries = &mut *guard;

        Ok(match entries.lru.get(text) {
            Some(hit) => Lookup::Hit(Arc::clone(hit)),
            None => Lookup::Miss {
                generation: entries.generation,
            },
        })
    }

    fn insert_or_promote(
        &self,
        text: &str,
        vector: Arc<[f32]>,
        generation: u64,
    ) -> Result<Arc<[f32]>, DomainError> {
        let mut entries = self.lock()?;

        if entries.generation != generation {
            tracing::debug!(text_len = text.len(), "Cache cleared during lookup, not caching");
            return Ok(vector);
        }

        // Another caller finished first: keep its entry, count this as a use
        if let Some(existing) = entries.lru.get(text).cloned() {
            return Ok(existing);
        }

        if let Some((evicted, _)) = entries.lru.push(text.to_string(), Arc::clone(&vector)) {
            tracing::debug!(evicted_len = evicted.len(), "Evicted least recently used embedding");
        }

        Ok(vector)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), DomainError> {
        let expected = self.provider.dimensions();

        if vector.is_empty() || vector.len() != expected {
            return Err(DomainError::provider_failed(
                self.provider.provider_name(),
                format!(
                    "expected {} embedding dimensions, got {}",
                    expected,
                    vector.len()
                ),
            ));
        }

        Ok(())
    }
}
