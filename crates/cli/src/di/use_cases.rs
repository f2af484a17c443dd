use super::FetchServices;
use guarded_fetch_application::ports::CacheMaintenancePort;
use guarded_fetch_application::services::{InflightDeduplicator, ResultCache};
use guarded_fetch_application::use_cases::{FetchDocumentUseCase, FetchImageUseCase};
use guarded_fetch_domain::{Config, FetchedResource, ValidatedImage};
use std::sync::Arc;

pub struct UseCases {
    pub fetch_image: Arc<FetchImageUseCase>,
    pub fetch_document: Arc<FetchDocumentUseCase>,
    pub image_cache: Arc<ResultCache<Arc<ValidatedImage>>>,
    pub document_cache: Arc<ResultCache<Arc<FetchedResource>>>,
}

impl UseCases {
    pub fn new(config: &Config, services: &FetchServices) -> Self {
        let image_cache = Arc::new(ResultCache::new(
            "images",
            config.cache.image_max_entries,
            config.cache.image_ttl(),
        ));
        let image_inflight = Arc::new(InflightDeduplicator::new(
            Arc::clone(&image_cache),
            config.inflight.max_entries,
            services.image_options.timeout(),
        ));

        let document_cache = Arc::new(ResultCache::new(
            "documents",
            config.cache.metadata_max_entries,
            config.cache.metadata_ttl(),
        ));
        let document_inflight = Arc::new(InflightDeduplicator::new(
            Arc::clone(&document_cache),
            config.inflight.max_entries,
            services.document_options.timeout(),
        ));

        Self {
            fetch_image: Arc::new(FetchImageUseCase::new(
                Arc::clone(&services.fetcher),
                Arc::clone(&services.validator),
                image_inflight,
                services.image_options,
            )),
            fetch_document: Arc::new(FetchDocumentUseCase::new(
                Arc::clone(&services.fetcher),
                document_inflight,
                services.document_options,
            )),
            image_cache,
            document_cache,
        }
    }

    /// Caches swept by the background job.
    pub fn sweepable_caches(&self) -> Vec<Arc<dyn CacheMaintenancePort>> {
        let images: Arc<dyn CacheMaintenancePort> = self.image_cache.clone();
        let documents: Arc<dyn CacheMaintenancePort> = self.document_cache.clone();
        vec![images, documents]
    }
}
