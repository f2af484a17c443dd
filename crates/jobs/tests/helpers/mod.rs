#![allow(dead_code)]

use guarded_fetch_application::ports::{CacheMaintenancePort, CacheSweepOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts sweep calls and reports `removed_per_sweep` removals each time.
pub struct MockCacheMaintenancePort {
    name: String,
    sweep_calls: AtomicUsize,
    removed_per_sweep: usize,
}

impl MockCacheMaintenancePort {
    pub fn new(name: &str) -> Self {
        Self::removing(name, 0)
    }

    pub fn removing(name: &str, removed_per_sweep: usize) -> Self {
        Self {
            name: name.to_string(),
            sweep_calls: AtomicUsize::new(0),
            removed_per_sweep,
        }
    }

    pub fn sweep_call_count(&self) -> usize {
        self.sweep_calls.load(Ordering::SeqCst)
    }
}

impl CacheMaintenancePort for MockCacheMaintenancePort {
    fn cache_name(&self) -> &str {
        &self.name
    }

    fn run_sweep_cycle(&self) -> CacheSweepOutcome {
        self.sweep_calls.fetch_add(1, Ordering::SeqCst);
        CacheSweepOutcome {
            entries_removed: self.removed_per_sweep,
            cache_size: 0,
        }
    }
}
