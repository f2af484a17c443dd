use async_trait::async_trait;
use guarded_fetch_application::ports::HostResolver;
use guarded_fetch_domain::FetchError;
use std::net::IpAddr;
use std::time::Duration;

/// System resolver (getaddrinfo via tokio), returning IPv4 and IPv6 results.
pub struct TokioHostResolver {
    timeout: Duration,
}

impl TokioHostResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HostResolver for TokioHostResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, FetchError> {
        // lookup_host wants a socket address; the port is discarded
        let target = format!("{}:0", host);

        let addrs_iter = tokio::time::timeout(self.timeout, tokio::net::lookup_host(&target))
            .await
            .map_err(|_| FetchError::ResolutionFailed {
                host: host.to_string(),
                reason: format!("lookup timed out after {}ms", self.timeout.as_millis()),
            })?
            .map_err(|e| FetchError::ResolutionFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let mut addresses: Vec<IpAddr> = addrs_iter.map(|addr| addr.ip()).collect();
        addresses.dedup();
        Ok(addresses)
    }
}
