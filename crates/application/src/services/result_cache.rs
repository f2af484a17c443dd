use crate::ports::{CacheMaintenancePort, CacheSweepOutcome};
use lru::LruCache;
use rustc_hash::FxBuildHasher;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

#[derive(Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Point-in-time view of a [`ResultCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultCacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl ResultCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            (self.hits as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

type Entries<T> = LruCache<String, CacheEntry<T>, FxBuildHasher>;

/// Bounded key/value store with per-entry TTL and least-recently-used
/// eviction.
///
/// Expired entries are never returned. They are dropped lazily on lookup,
/// ahead of LRU eviction when the cache is full, and by [`cleanup`].
///
/// [`cleanup`]: ResultCache::cleanup
pub struct ResultCache<T> {
    name: String,
    entries: Mutex<Entries<T>>,
    default_ttl: Duration,
    metrics: CacheMetrics,
}

impl<T: Clone> ResultCache<T> {
    /// A `max_entries` of zero is treated as one.
    pub fn new(name: impl Into<String>, max_entries: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            name: name.into(),
            entries: Mutex::new(LruCache::with_hasher(capacity, FxBuildHasher)),
            default_ttl,
            metrics: CacheMetrics::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the value for `key` if present and unexpired, marking it most
    /// recently used.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut entries = self.lock();

        let expired = match entries.peek(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.metrics.misses.fetch_add(1, AtomicOrdering::Relaxed);
                return None;
            }
        };

        if expired {
            entries.pop(key);
            self.metrics.expirations.fetch_add(1, AtomicOrdering::Relaxed);
            self.metrics.misses.fetch_add(1, AtomicOrdering::Relaxed);
            return None;
        }

        self.metrics.hits.fetch_add(1, AtomicOrdering::Relaxed);
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Like [`get`] but leaves recency and hit/miss metrics untouched.
    ///
    /// [`get`]: ResultCache::get
    pub fn peek_fresh(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        self.lock()
            .peek(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: &str, value: T) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Inserts or replaces `key`. When full, expired entries are purged first
    /// and only then is the least recently used entry evicted.
    pub fn set_with_ttl(&self, key: &str, value: T, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.lock();

        if !entries.contains(key) && entries.len() >= entries.cap().get() {
            let purged = purge_expired(&mut entries, now);
            self.metrics
                .expirations
                .fetch_add(purged as u64, AtomicOrdering::Relaxed);

            if entries.len() >= entries.cap().get() && entries.pop_lru().is_some() {
                self.metrics.evictions.fetch_add(1, AtomicOrdering::Relaxed);
            }
        }

        entries.put(
            key.to_owned(),
            CacheEntry {
                value,
                inserted_at: now,
                ttl,
            },
        );
        self.metrics.insertions.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let mut entries = self.lock();
        let removed = purge_expired(&mut entries, Instant::now());
        self.metrics
            .expirations
            .fetch_add(removed as u64, AtomicOrdering::Relaxed);
        removed
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> ResultCacheStats {
        let (entries, capacity) = {
            let guard = self.lock();
            (guard.len(), guard.cap().get())
        };
        ResultCacheStats {
            entries,
            capacity,
            hits: self.metrics.hits.load(AtomicOrdering::Relaxed),
            misses: self.metrics.misses.load(AtomicOrdering::Relaxed),
            insertions: self.metrics.insertions.load(AtomicOrdering::Relaxed),
            evictions: self.metrics.evictions.load(AtomicOrdering::Relaxed),
            expirations: self.metrics.expirations.load(AtomicOrdering::Relaxed),
        }
    }
}

fn purge_expired<T>(entries: &mut Entries<T>, now: Instant) -> usize {
    let expired: Vec<String> = entries
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(key, _)| key.clone())
        .collect();

    for key in &expired {
        entries.pop(key.as_str());
    }
    expired.len()
}

impl<T: Clone + Send> CacheMaintenancePort for ResultCache<T> {
    fn cache_name(&self) -> &str {
        &self.name
    }

    fn run_sweep_cycle(&self) -> CacheSweepOutcome {
        let entries_removed = self.cleanup();
        let cache_size = self.len();
        if entries_removed > 0 {
            debug!(
                cache = %self.name,
                removed = entries_removed,
                remaining = cache_size,
                "Swept expired entries"
            );
        }
        CacheSweepOutcome {
            entries_removed,
            cache_size,
        }
    }
}
