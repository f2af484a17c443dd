/// Outcome of a cache sweep cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheSweepOutcome {
    pub entries_removed: usize,
    pub cache_size: usize,
}

/// Port for periodic cache maintenance.
pub trait CacheMaintenancePort: Send + Sync {
    fn cache_name(&self) -> &str;

    /// Remove expired entries to reclaim memory.
    fn run_sweep_cycle(&self) -> CacheSweepOutcome;
}
