use crate::ports::{ContentFetcher, MetadataParser};
use crate::services::InflightDeduplicator;
use guarded_fetch_domain::{ContentKind, FetchError, FetchRequest, PageMetadata, SecurityOptions};
use std::sync::Arc;
use tracing::warn;

const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

pub struct FetchPageMetadataUseCase {
    fetcher: Arc<dyn ContentFetcher>,
    parser: Arc<dyn MetadataParser>,
    inflight: Arc<InflightDeduplicator<Arc<PageMetadata>>>,
    options: SecurityOptions,
}

impl FetchPageMetadataUseCase {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        parser: Arc<dyn MetadataParser>,
        inflight: Arc<InflightDeduplicator<Arc<PageMetadata>>>,
        options: SecurityOptions,
    ) -> Self {
        Self {
            fetcher,
            parser,
            inflight,
            options: options.with_markup_format(false),
        }
    }

    pub async fn execute(&self, url: &str) -> Result<Arc<PageMetadata>, FetchError> {
        let request = FetchRequest::new(url, ContentKind::Document, self.options)
            .inspect_err(|e| warn!(url, error = %e, "Rejected page URL"))?;
        let key = request.cache_key();
        let fetcher = Arc::clone(&self.fetcher);
        let parser = Arc::clone(&self.parser);

        self.inflight
            .get_with_timeout(&key, self.options.timeout(), move || async move {
                let resource = fetcher.fetch(&request).await?;

                if let Some(content_type) = resource.content_type.as_deref() {
                    if !is_html(content_type) {
                        return Err(FetchError::UnsupportedFormat(format!(
                            "expected an HTML document, got '{}'",
                            content_type
                        )));
                    }
                }

                let html = String::from_utf8_lossy(&resource.body);
                let metadata = parser.parse(&html, &resource.final_url)?;
                Ok(Arc::new(metadata))
            })
            .await
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    HTML_CONTENT_TYPES.contains(&mime.as_str())
}
