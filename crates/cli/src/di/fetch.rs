use guarded_fetch_application::ports::{ContentFetcher, ContentValidatorPort, HostResolver};
use guarded_fetch_domain::{Config, SecurityOptions};
use guarded_fetch_infrastructure::content::ContentValidator;
use guarded_fetch_infrastructure::fetch::{SecureFetcher, TokioHostResolver};
use std::sync::Arc;
use std::time::Duration;

pub struct FetchServices {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub validator: Arc<dyn ContentValidatorPort>,
    pub document_options: SecurityOptions,
    pub image_options: SecurityOptions,
}

impl FetchServices {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let resolver: Arc<dyn HostResolver> = Arc::new(TokioHostResolver::new(
            Duration::from_millis(config.fetch.connect_timeout_ms),
        ));

        Ok(Self {
            fetcher: Arc::new(SecureFetcher::new(resolver, &config.fetch)),
            validator: Arc::new(ContentValidator::new()),
            document_options: SecurityOptions::for_documents(&config.fetch)?,
            image_options: SecurityOptions::for_images(&config.fetch)?,
        })
    }
}
