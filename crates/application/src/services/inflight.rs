use super::result_cache::ResultCache;
use dashmap::DashMap;
use guarded_fetch_domain::FetchError;
use rustc_hash::FxBuildHasher;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, warn};

type Outcome<T> = Option<Result<T, FetchError>>;

struct InflightEntry<T> {
    id: u64,
    created_at: Instant,
    outcome: watch::Receiver<Outcome<T>>,
}

type InflightMap<T> = DashMap<String, InflightEntry<T>, FxBuildHasher>;

/// Releases the in-flight slot when the producer task finishes, panics or is
/// aborted. Only the entry created by this producer is removed.
struct InflightSlotGuard<T> {
    entries: Arc<InflightMap<T>>,
    in_flight: Arc<AtomicUsize>,
    key: String,
    id: u64,
}

impl<T> Drop for InflightSlotGuard<T> {
    fn drop(&mut self) {
        if let Some((_, entry)) = self.entries.remove_if(&self.key, |_, e| e.id == self.id) {
            self.in_flight.fetch_sub(1, AtomicOrdering::AcqRel);
            debug!(
                key = %self.key,
                elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
                "In-flight fetch settled"
            );
        }
    }
}

enum Registration<T> {
    Cached(T),
    Follower(watch::Receiver<Outcome<T>>),
    Leader {
        id: u64,
        tx: watch::Sender<Outcome<T>>,
        rx: watch::Receiver<Outcome<T>>,
    },
}

/// Coalesces concurrent requests for the same key into one producer run.
///
/// The first caller for a key becomes the leader and spawns the producer on
/// its own task; later callers subscribe to the same outcome. Successful
/// results are written to the backing [`ResultCache`] before the key is
/// released, so a caller either joins the running fetch or sees the cached
/// value. Failures are shared with every waiter but never cached.
///
/// Each producer run is bounded by a timeout and the number of distinct keys
/// in flight is capped; callers over the cap get
/// [`FetchError::TooManyInFlight`] without anything being scheduled.
pub struct InflightDeduplicator<T> {
    cache: Arc<ResultCache<T>>,
    entries: Arc<InflightMap<T>>,
    in_flight: Arc<AtomicUsize>,
    next_id: AtomicU64,
    max_entries: usize,
    default_timeout: Duration,
}

impl<T> InflightDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(cache: Arc<ResultCache<T>>, max_entries: usize, default_timeout: Duration) -> Self {
        Self {
            cache,
            entries: Arc::new(DashMap::with_hasher(FxBuildHasher)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(0),
            max_entries: max_entries.max(1),
            default_timeout,
        }
    }

    pub async fn get<F, Fut>(&self, key: &str, producer: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        self.get_with_timeout(key, self.default_timeout, producer)
            .await
    }

    /// Returns the cached value for `key`, joins a running fetch for it, or
    /// starts `producer` bounded by `timeout`.
    ///
    /// The producer runs to completion (or timeout) even if every caller
    /// stops waiting.
    pub async fn get_with_timeout<F, Fut>(
        &self,
        key: &str,
        timeout: Duration,
        producer: F,
    ) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        if let Some(value) = self.cache.get(key) {
            debug!(key, "Cache HIT");
            return Ok(value);
        }

        let mut rx = match self.register_or_join(key)? {
            Registration::Cached(value) => return Ok(value),
            Registration::Follower(rx) => {
                debug!(key, "Joining in-flight fetch");
                rx
            }
            Registration::Leader { id, tx, rx } => {
                debug!(key, "Cache MISS");
                self.spawn_producer(key.to_owned(), id, tx, timeout, producer);
                rx
            }
        };

        wait_for_outcome(&mut rx).await
    }

    /// Number of keys with a producer currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(AtomicOrdering::Acquire)
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn cache(&self) -> &Arc<ResultCache<T>> {
        &self.cache
    }

    fn register_or_join(&self, key: &str) -> Result<Registration<T>, FetchError> {
        match self.entries.entry(key.to_owned()) {
            dashmap::Entry::Occupied(e) => Ok(Registration::Follower(e.get().outcome.clone())),
            dashmap::Entry::Vacant(e) => {
                // a leader may have finished between the first cache check and
                // taking this shard lock
                if let Some(value) = self.cache.peek_fresh(key) {
                    return Ok(Registration::Cached(value));
                }

                if !self.try_reserve_slot() {
                    warn!(
                        key,
                        limit = self.max_entries,
                        "Rejecting fetch: in-flight limit reached"
                    );
                    return Err(FetchError::TooManyInFlight {
                        limit: self.max_entries,
                    });
                }

                let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
                let (tx, rx) = watch::channel(None);
                e.insert(InflightEntry {
                    id,
                    created_at: Instant::now(),
                    outcome: rx.clone(),
                });
                Ok(Registration::Leader { id, tx, rx })
            }
        }
    }

    fn try_reserve_slot(&self) -> bool {
        let max = self.max_entries;
        self.in_flight
            .fetch_update(AtomicOrdering::AcqRel, AtomicOrdering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }

    fn spawn_producer<F, Fut>(
        &self,
        key: String,
        id: u64,
        tx: watch::Sender<Outcome<T>>,
        timeout: Duration,
        producer: F,
    ) where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let guard = InflightSlotGuard {
            entries: Arc::clone(&self.entries),
            in_flight: Arc::clone(&self.in_flight),
            key: key.clone(),
            id,
        };
        let cache = Arc::clone(&self.cache);

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, producer()).await {
                Ok(result) => result,
                Err(_) => {
                    let after_ms = timeout.as_millis() as u64;
                    warn!(key = %key, timeout_ms = after_ms, "In-flight fetch timed out");
                    Err(FetchError::Timeout { after_ms })
                }
            };

            match &outcome {
                Ok(value) => cache.set(&key, value.clone()),
                Err(e) => debug!(key = %key, error = %e, "In-flight fetch failed"),
            }

            // release the key before publishing so a woken caller starts fresh
            drop(guard);
            tx.send_replace(Some(outcome));
        });
    }
}

async fn wait_for_outcome<T: Clone>(
    rx: &mut watch::Receiver<Outcome<T>>,
) -> Result<T, FetchError> {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => match outcome.as_ref() {
            Some(result) => result.clone(),
            None => Err(FetchError::Internal(
                "in-flight outcome missing".to_string(),
            )),
        },
        Err(_) => Err(FetchError::Internal(
            "in-flight producer terminated without a result".to_string(),
        )),
    }
}
