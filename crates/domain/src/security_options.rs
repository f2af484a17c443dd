use crate::config::{ConfigError, FetchConfig};
use serde::Serialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_REDIRECTS: u32 = 3;
const MAX_ALLOWED_REDIRECTS: u32 = 20;

/// Per-fetch security settings. Validated once at construction and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SecurityOptions {
    https_only: bool,
    timeout_ms: u64,
    max_redirects: u32,
    allow_markup_format: bool,
}

impl SecurityOptions {
    pub fn new(
        https_only: bool,
        timeout_ms: u64,
        max_redirects: u32,
        allow_markup_format: bool,
    ) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        if max_redirects > MAX_ALLOWED_REDIRECTS {
            return Err(ConfigError::Validation(format!(
                "max_redirects must be at most {}",
                MAX_ALLOWED_REDIRECTS
            )));
        }

        Ok(Self {
            https_only,
            timeout_ms,
            max_redirects,
            allow_markup_format,
        })
    }

    /// Options for HTML documents (shorter budget, markup never treated as an image).
    pub fn for_documents(config: &FetchConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.https_only,
            config.document_timeout_ms,
            config.max_redirects,
            false,
        )
    }

    pub fn for_images(config: &FetchConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.https_only,
            config.image_timeout_ms,
            config.max_redirects,
            config.allow_markup_format,
        )
    }

    pub fn https_only(&self) -> bool {
        self.https_only
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    pub fn allow_markup_format(&self) -> bool {
        self.allow_markup_format
    }

    /// Compact encoding of every field, used to keep results fetched under
    /// different policies apart.
    pub fn policy_tag(&self) -> String {
        format!(
            "{}-r{}-t{}{}",
            if self.https_only { "https" } else { "http" },
            self.max_redirects,
            self.timeout_ms,
            if self.allow_markup_format { "+svg" } else { "" }
        )
    }

    pub fn with_markup_format(self, allow: bool) -> Self {
        Self {
            allow_markup_format: allow,
            ..self
        }
    }
}

impl Default for SecurityOptions {
    fn default() -> Self {
        Self {
            https_only: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            allow_markup_format: false,
        }
    }
}
