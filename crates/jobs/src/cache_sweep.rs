use guarded_fetch_application::ports::CacheMaintenancePort;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Periodically drops expired entries from every registered cache.
pub struct CacheSweepJob {
    caches: Vec<Arc<dyn CacheMaintenancePort>>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl CacheSweepJob {
    pub fn new(caches: Vec<Arc<dyn CacheMaintenancePort>>) -> Self {
        Self {
            caches,
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Runs one sweep over every cache and returns the total removed.
    pub fn sweep_once(&self) -> usize {
        let mut total_removed = 0;
        for cache in &self.caches {
            let outcome = cache.run_sweep_cycle();
            if outcome.entries_removed > 0 {
                info!(
                    cache = cache.cache_name(),
                    entries_removed = outcome.entries_removed,
                    cache_size = outcome.cache_size,
                    "Cache sweep cycle completed"
                );
            }
            total_removed += outcome.entries_removed;
        }
        total_removed
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            caches = self.caches.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Starting cache sweep job"
        );

        let job = Arc::clone(&self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(job.interval);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = job.shutdown.cancelled() => {
                        info!("CacheSweepJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = job.sweep_once();
                        debug!(removed, "Cache sweep tick");
                    }
                }
            }
        });
    }
}
