use serde::{Deserialize, Serialize};

use super::cache::CacheConfig;
use super::errors::ConfigError;
use super::fetch::FetchConfig;
use super::inflight::InflightConfig;
use super::logging::LoggingConfig;
use crate::security_options::SecurityOptions;

const LOCAL_CONFIG_PATH: &str = "guarded-fetch.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/guarded-fetch/config.toml";

/// Main configuration structure for Guarded Fetch
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Outbound fetch policy
    #[serde(default)]
    pub fetch: FetchConfig,

    /// In-flight request deduplication
    #[serde(default)]
    pub inflight: InflightConfig,

    /// Result caches
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. guarded-fetch.toml in current directory
    /// 3. /etc/guarded-fetch/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if let Some(path) = Self::get_config_path() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(https_only) = overrides.https_only {
            self.fetch.https_only = https_only;
        }
        if let Some(allow) = overrides.allow_markup_format {
            self.fetch.allow_markup_format = allow;
        }
        if let Some(max) = overrides.max_redirects {
            self.fetch.max_redirects = max;
        }
        if let Some(max) = overrides.inflight_max_entries {
            self.inflight.max_entries = max;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        SecurityOptions::for_documents(&self.fetch)?;
        SecurityOptions::for_images(&self.fetch)?;

        if self.inflight.max_entries == 0 {
            return Err(ConfigError::Validation(
                "inflight.max_entries must be greater than 0".to_string(),
            ));
        }

        if self.cache.metadata_max_entries == 0 || self.cache.image_max_entries == 0 {
            return Err(ConfigError::Validation(
                "cache sizes must be greater than 0".to_string(),
            ));
        }

        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "cache.sweep_interval_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        if std::path::Path::new(LOCAL_CONFIG_PATH).exists() {
            Some(LOCAL_CONFIG_PATH.to_string())
        } else if std::path::Path::new(SYSTEM_CONFIG_PATH).exists() {
            Some(SYSTEM_CONFIG_PATH.to_string())
        } else {
            None
        }
    }
}

/// Command-line (and environment) overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub https_only: Option<bool>,
    pub allow_markup_format: Option<bool>,
    pub max_redirects: Option<u32>,
    pub inflight_max_entries: Option<usize>,
    pub log_level: Option<String>,
}
