use crate::ports::ContentFetcher;
use crate::services::InflightDeduplicator;
use guarded_fetch_domain::{ContentKind, FetchError, FetchRequest, FetchedResource, SecurityOptions};
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw document fetch with the document byte cap, deduplicated and cached
/// like every other fetch.
pub struct FetchDocumentUseCase {
    fetcher: Arc<dyn ContentFetcher>,
    inflight: Arc<InflightDeduplicator<Arc<FetchedResource>>>,
    options: SecurityOptions,
}

impl FetchDocumentUseCase {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        inflight: Arc<InflightDeduplicator<Arc<FetchedResource>>>,
        options: SecurityOptions,
    ) -> Self {
        Self {
            fetcher,
            inflight,
            options: options.with_markup_format(false),
        }
    }

    pub async fn execute(&self, url: &str) -> Result<Arc<FetchedResource>, FetchError> {
        let request = FetchRequest::new(url, ContentKind::Document, self.options)
            .inspect_err(|e| warn!(url, error = %e, "Rejected document URL"))?;
        let key = request.cache_key();
        let fetcher = Arc::clone(&self.fetcher);

        self.inflight
            .get_with_timeout(&key, self.options.timeout(), move || async move {
                let resource = fetcher.fetch(&request).await?;
                debug!(
                    url = %resource.final_url,
                    bytes = resource.body.len(),
                    "Document fetched"
                );
                Ok(Arc::new(resource))
            })
            .await
    }
}
