use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_false")]
    pub https_only: bool,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Accept SVG images (sanitized) in addition to raster formats.
    #[serde(default = "default_false")]
    pub allow_markup_format: bool,

    #[serde(default = "default_document_timeout_ms")]
    pub document_timeout_ms: u64,

    #[serde(default = "default_image_timeout_ms")]
    pub image_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            https_only: default_false(),
            max_redirects: default_max_redirects(),
            allow_markup_format: default_false(),
            document_timeout_ms: default_document_timeout_ms(),
            image_timeout_ms: default_image_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
        }
    }
}

fn default_false() -> bool {
    false
}

fn default_max_redirects() -> u32 {
    3
}

fn default_document_timeout_ms() -> u64 {
    5_000
}

fn default_image_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_user_agent() -> String {
    format!("guarded-fetch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_pool_max_idle_per_host() -> usize {
    8
}

fn default_pool_idle_timeout_secs() -> u64 {
    30
}
