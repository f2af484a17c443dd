use guarded_fetch_application::ports::HostResolver;
use guarded_fetch_domain::{classify, FetchError};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, warn};

type BoxError = Box<dyn StdError + Send + Sync>;

/// Resolves `host` and returns its addresses only if every one of them is
/// public. A single private or reserved answer rejects the whole lookup, as
/// does an empty answer or a resolver failure.
pub async fn resolve_checked(
    resolver: &dyn HostResolver,
    host: &str,
) -> Result<Vec<IpAddr>, FetchError> {
    let addresses = resolver.lookup(host).await?;

    if addresses.is_empty() {
        return Err(FetchError::ResolutionFailed {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        });
    }

    if let Some(blocked) = addresses.iter().find(|ip| !classify(**ip).is_public()) {
        warn!(
            host,
            address = %blocked,
            answers = addresses.len(),
            "Blocked connection to private or reserved address"
        );
        return Err(FetchError::BlockedAddress {
            host: host.to_string(),
            address: blocked.to_string(),
        });
    }

    debug!(host, answers = addresses.len(), "Resolved to public addresses");
    Ok(addresses)
}

/// DNS hook for the HTTP client. The addresses validated here are the ones
/// the connection is made to, so there is no window between check and use.
pub struct GuardedResolver {
    inner: Arc<dyn HostResolver>,
}

impl GuardedResolver {
    pub fn new(inner: Arc<dyn HostResolver>) -> Self {
        Self { inner }
    }
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let addresses = resolve_checked(inner.as_ref(), name.as_str()).await?;
            // the client replaces port 0 with the URL's port
            let addrs: Addrs = Box::new(
                addresses
                    .into_iter()
                    .map(|ip| SocketAddr::new(ip, 0)),
            );
            Ok::<_, BoxError>(addrs)
        })
    }
}
