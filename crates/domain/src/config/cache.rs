use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_metadata_max_entries")]
    pub metadata_max_entries: usize,

    #[serde(default = "default_metadata_ttl_secs")]
    pub metadata_ttl_secs: u64,

    #[serde(default = "default_image_max_entries")]
    pub image_max_entries: usize,

    #[serde(default = "default_image_ttl_secs")]
    pub image_ttl_secs: u64,

    /// Interval of the background sweep removing expired entries.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_ttl_secs)
    }

    pub fn image_ttl(&self) -> Duration {
        Duration::from_secs(self.image_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            metadata_max_entries: default_metadata_max_entries(),
            metadata_ttl_secs: default_metadata_ttl_secs(),
            image_max_entries: default_image_max_entries(),
            image_ttl_secs: default_image_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_metadata_max_entries() -> usize {
    100
}

fn default_metadata_ttl_secs() -> u64 {
    300
}

fn default_image_max_entries() -> usize {
    50
}

fn default_image_ttl_secs() -> u64 {
    600
}

fn default_sweep_interval_secs() -> u64 {
    60
}
