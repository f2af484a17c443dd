use crate::ports::{ContentFetcher, ContentValidatorPort};
use crate::services::InflightDeduplicator;
use guarded_fetch_domain::{
    ContentKind, FetchError, FetchRequest, SecurityOptions, ValidatedImage,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct FetchImageUseCase {
    fetcher: Arc<dyn ContentFetcher>,
    validator: Arc<dyn ContentValidatorPort>,
    inflight: Arc<InflightDeduplicator<Arc<ValidatedImage>>>,
    options: SecurityOptions,
}

impl FetchImageUseCase {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        validator: Arc<dyn ContentValidatorPort>,
        inflight: Arc<InflightDeduplicator<Arc<ValidatedImage>>>,
        options: SecurityOptions,
    ) -> Self {
        Self {
            fetcher,
            validator,
            inflight,
            options,
        }
    }

    pub async fn execute(&self, url: &str) -> Result<Arc<ValidatedImage>, FetchError> {
        self.execute_with(url, self.options).await
    }

    pub async fn execute_with(
        &self,
        url: &str,
        options: SecurityOptions,
    ) -> Result<Arc<ValidatedImage>, FetchError> {
        let request = FetchRequest::new(url, ContentKind::Image, options).inspect_err(|e| {
            warn!(url, error = %e, "Rejected image URL");
        })?;
        let key = request.cache_key();
        let fetcher = Arc::clone(&self.fetcher);
        let validator = Arc::clone(&self.validator);

        self.inflight
            .get_with_timeout(&key, options.timeout(), move || async move {
                let resource = fetcher.fetch(&request).await?;
                debug!(
                    url = %resource.final_url,
                    bytes = resource.body.len(),
                    "Validating fetched image"
                );

                let image = tokio::task::spawn_blocking(move || {
                    validator.validate(
                        &resource.body,
                        resource.content_type.as_deref(),
                        &request.options,
                    )
                })
                .await
                .map_err(|e| FetchError::Internal(format!("image validation task failed: {e}")))??;

                Ok(Arc::new(image))
            })
            .await
    }
}
