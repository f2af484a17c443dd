//! Configuration module for Guarded Fetch
//!
//! - `root`: Main configuration, file loading and CLI overrides
//! - `fetch`: Outbound fetch policy and connection pool settings
//! - `inflight`: Request deduplication limits
//! - `cache`: Result cache sizing, TTLs and sweep cadence
//! - `logging`: Logging settings
//! - `errors`: Configuration errors

pub mod cache;
pub mod errors;
pub mod fetch;
pub mod inflight;
pub mod logging;
pub mod root;

pub use cache::CacheConfig;
pub use errors::ConfigError;
pub use fetch::FetchConfig;
pub use inflight::InflightConfig;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
