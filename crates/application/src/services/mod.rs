mod inflight;
mod result_cache;

pub use inflight::InflightDeduplicator;
pub use result_cache::{ResultCache, ResultCacheStats};
