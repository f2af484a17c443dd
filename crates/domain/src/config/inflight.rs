use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InflightConfig {
    /// Maximum number of distinct keys being fetched concurrently.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for InflightConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> usize {
    1000
}
