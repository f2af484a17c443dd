use guarded_fetch_domain::{FetchError, PageMetadata};

pub trait MetadataParser: Send + Sync {
    fn parse(&self, html: &str, page_url: &str) -> Result<PageMetadata, FetchError>;
}
