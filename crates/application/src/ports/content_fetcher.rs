use async_trait::async_trait;
use guarded_fetch_domain::{FetchError, FetchRequest, FetchedResource};

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch `request.url` with connection-time address validation,
    /// per-hop redirect checks and the kind's body limit applied.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedResource, FetchError>;
}
