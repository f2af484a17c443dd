#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use guarded_fetch_application::ports::{ContentFetcher, ContentValidatorPort, MetadataParser};
use guarded_fetch_domain::{
    ContentFormat, FetchError, FetchRequest, FetchedResource, PageMetadata, SecurityOptions,
    ValidatedImage,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct MockFetcher {
    call_count: Arc<AtomicUsize>,
    delay: Duration,
    content_type: Option<String>,
    body: Bytes,
    error: Mutex<Option<FetchError>>,
}

impl MockFetcher {
    pub fn new(content_type: &str, body: &'static [u8]) -> Self {
        Self {
            call_count: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            content_type: Some(content_type.to_string()),
            body: Bytes::from_static(body),
            error: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn without_content_type(mut self) -> Self {
        self.content_type = None;
        self
    }

    pub fn fail_with(&self, error: FetchError) {
        *self.error.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedResource, FetchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = self.error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(FetchedResource {
            final_url: request.url.to_string(),
            content_type: self.content_type.clone(),
            body: self.body.clone(),
        })
    }
}

/// Accepts any body as a 1x1 PNG unless told to reject.
#[derive(Default)]
pub struct MockValidator {
    call_count: AtomicUsize,
    reject_with: Mutex<Option<FetchError>>,
}

impl MockValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_with(&self, error: FetchError) {
        *self.reject_with.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl ContentValidatorPort for MockValidator {
    fn validate(
        &self,
        body: &Bytes,
        _declared_type: Option<&str>,
        _options: &SecurityOptions,
    ) -> Result<ValidatedImage, FetchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.reject_with.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(ValidatedImage {
            format: ContentFormat::Png,
            width: Some(1),
            height: Some(1),
            bytes: body.clone(),
            warnings: vec![],
        })
    }
}

/// Takes the first `<title>` as the title.
#[derive(Default)]
pub struct MockParser {
    call_count: AtomicUsize,
}

impl MockParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl MetadataParser for MockParser {
    fn parse(&self, html: &str, page_url: &str) -> Result<PageMetadata, FetchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let title = html
            .split_once("<title>")
            .and_then(|(_, rest)| rest.split_once("</title>"))
            .map(|(title, _)| title.to_string());
        Ok(PageMetadata {
            title,
            ..PageMetadata::new(page_url)
        })
    }
}
