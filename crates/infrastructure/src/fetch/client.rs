use super::connector::GuardedResolver;
use super::redirect::redirect_policy;
use async_trait::async_trait;
use bytes::BytesMut;
use dashmap::DashMap;
use guarded_fetch_application::ports::{ContentFetcher, HostResolver};
use guarded_fetch_domain::config::FetchConfig;
use guarded_fetch_domain::{validate_url, FetchError, FetchRequest, FetchedResource, SecurityOptions};
use reqwest::header::CONTENT_TYPE;
use rustc_hash::FxBuildHasher;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client settings shared by every [`SecurityOptions`] variant.
#[derive(Debug, Clone)]
struct ClientSettings {
    user_agent: String,
    connect_timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Duration,
}

/// [`ContentFetcher`] backed by reqwest with address validation at connect
/// time, per-hop redirect checks and streamed body limits.
///
/// Redirect policy and timeout are fixed per client, so one pooled client is
/// built lazily for each distinct set of options.
pub struct SecureFetcher {
    resolver: Arc<dyn HostResolver>,
    settings: ClientSettings,
    clients: DashMap<SecurityOptions, reqwest::Client, FxBuildHasher>,
}

impl SecureFetcher {
    pub fn new(resolver: Arc<dyn HostResolver>, config: &FetchConfig) -> Self {
        Self {
            resolver,
            settings: ClientSettings {
                user_agent: config.user_agent.clone(),
                connect_timeout: Duration::from_millis(config.connect_timeout_ms),
                pool_max_idle_per_host: config.pool_max_idle_per_host,
                pool_idle_timeout: Duration::from_secs(config.pool_idle_timeout_secs),
            },
            clients: DashMap::with_hasher(FxBuildHasher),
        }
    }

    fn client_for(&self, options: &SecurityOptions) -> Result<reqwest::Client, FetchError> {
        if let Some(client) = self.clients.get(options) {
            return Ok(client.clone());
        }

        let client = self.build_client(options)?;
        Ok(self.clients.entry(*options).or_insert(client).clone())
    }

    fn build_client(&self, options: &SecurityOptions) -> Result<reqwest::Client, FetchError> {
        debug!(
            https_only = options.https_only(),
            timeout_ms = options.timeout_ms(),
            max_redirects = options.max_redirects(),
            "Building HTTP client"
        );

        reqwest::Client::builder()
            .use_rustls_tls()
            // a proxy would resolve the target on our behalf
            .no_proxy()
            .dns_resolver(Arc::new(GuardedResolver::new(Arc::clone(&self.resolver))))
            .redirect(redirect_policy(*options))
            .https_only(options.https_only())
            .connect_timeout(self.settings.connect_timeout)
            .timeout(options.timeout())
            .pool_max_idle_per_host(self.settings.pool_max_idle_per_host)
            .pool_idle_timeout(self.settings.pool_idle_timeout)
            .user_agent(self.settings.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Internal(format!("failed to build HTTP client: {e}")))
    }
}

#[async_trait]
impl ContentFetcher for SecureFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedResource, FetchError> {
        let options = &request.options;
        // literal hosts bypass the resolver, so the URL is re-checked here
        // even when the request was built through `FetchRequest::new`
        validate_url(request.url.as_str(), options.https_only())?;

        let client = self.client_for(options)?;
        let limit = request.kind.max_bytes();

        debug!(
            url = %request.url,
            kind = request.kind.as_str(),
            limit,
            "Fetching"
        );

        let mut response = client
            .get(request.url.clone())
            .send()
            .await
            .map_err(|e| map_transport_error(e, options))?;

        let final_url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus {
                status: status.as_u16(),
                url: final_url,
            });
        }

        if let Some(declared) = response.content_length() {
            if declared > limit {
                warn!(url = %final_url, size = declared, limit, "Declared body exceeds limit");
                return Err(FetchError::OversizedPayload {
                    size: declared,
                    limit,
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let initial = response.content_length().unwrap_or(0).min(limit) as usize;
        let mut body = BytesMut::with_capacity(initial);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| map_transport_error(e, options))?
        {
            let size = (body.len() + chunk.len()) as u64;
            if size > limit {
                warn!(url = %final_url, size, limit, "Streamed body exceeds limit");
                return Err(FetchError::OversizedPayload { size, limit });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = %final_url, bytes = body.len(), "Fetch complete");

        Ok(FetchedResource {
            final_url,
            content_type,
            body: body.freeze(),
        })
    }
}

/// Recovers the policy error raised by the resolver or redirect hook from the
/// client's error chain.
pub fn map_transport_error(error: reqwest::Error, options: &SecurityOptions) -> FetchError {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(fetch_error) = cause.downcast_ref::<FetchError>() {
            return fetch_error.clone();
        }
        source = cause.source();
    }

    if error.is_timeout() {
        return FetchError::Timeout {
            after_ms: options.timeout_ms(),
        };
    }

    FetchError::Transport(error.to_string())
}
