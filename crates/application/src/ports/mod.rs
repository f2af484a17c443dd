mod cache_maintenance_port;
mod content_fetcher;
mod content_validator;
mod host_resolver;
mod metadata_parser;

pub use cache_maintenance_port::{CacheMaintenancePort, CacheSweepOutcome};
pub use content_fetcher::ContentFetcher;
pub use content_validator::ContentValidatorPort;
pub use host_resolver::HostResolver;
pub use metadata_parser::MetadataParser;
