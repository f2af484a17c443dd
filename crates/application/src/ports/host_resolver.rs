use async_trait::async_trait;
use guarded_fetch_domain::FetchError;
use std::net::IpAddr;

/// Resolves a hostname to every address the system resolver returns.
///
/// Implementations return the full set; callers classify each address.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, FetchError>;
}
