mod helpers;

use guarded_fetch_application::services::{InflightDeduplicator, ResultCache};
use guarded_fetch_application::use_cases::FetchPageMetadataUseCase;
use guarded_fetch_domain::{FetchError, SecurityOptions};
use helpers::{MockFetcher, MockParser};
use std::sync::Arc;
use std::time::Duration;

const PAGE: &[u8] = b"<html><head><title>Hello</title></head></html>";

fn make_use_case(fetcher: Arc<MockFetcher>, parser: Arc<MockParser>) -> FetchPageMetadataUseCase {
    let cache = Arc::new(ResultCache::new("metadata", 100, Duration::from_secs(300)));
    let inflight = Arc::new(InflightDeduplicator::new(cache, 100, Duration::from_secs(5)));
    FetchPageMetadataUseCase::new(fetcher, parser, inflight, SecurityOptions::default())
}

#[tokio::test]
async fn test_execute_parses_html_once() {
    let fetcher = Arc::new(MockFetcher::new("text/html; charset=utf-8", PAGE));
    let parser = Arc::new(MockParser::new());
    let use_case = make_use_case(fetcher.clone(), parser.clone());

    let first = use_case.execute("https://example.com/post").await.unwrap();
    let second = use_case.execute("https://example.com/post").await.unwrap();

    assert_eq!(first.title.as_deref(), Some("Hello"));
    assert_eq!(first.url, "https://example.com/post");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(parser.call_count(), 1);
}

#[tokio::test]
async fn test_non_html_content_type_is_rejected() {
    let fetcher = Arc::new(MockFetcher::new("application/json", b"{}"));
    let parser = Arc::new(MockParser::new());
    let use_case = make_use_case(fetcher, parser.clone());

    let result = use_case.execute("https://example.com/api").await;
    assert!(matches!(result, Err(FetchError::UnsupportedFormat(_))));
    assert_eq!(parser.call_count(), 0);
}

#[tokio::test]
async fn test_missing_content_type_is_parsed() {
    let fetcher = Arc::new(MockFetcher::new("", PAGE).without_content_type());
    let use_case = make_use_case(fetcher, Arc::new(MockParser::new()));

    let metadata = use_case.execute("https://example.com/").await.unwrap();
    assert_eq!(metadata.title.as_deref(), Some("Hello"));
}

#[tokio::test]
async fn test_https_only_rejects_plain_http() {
    let fetcher = Arc::new(MockFetcher::new("text/html", PAGE));
    let cache = Arc::new(ResultCache::new("metadata", 100, Duration::from_secs(300)));
    let inflight = Arc::new(InflightDeduplicator::new(cache, 100, Duration::from_secs(5)));
    let options = SecurityOptions::new(true, 5_000, 3, false).unwrap();
    let use_case =
        FetchPageMetadataUseCase::new(fetcher.clone(), Arc::new(MockParser::new()), inflight, options);

    let result = use_case.execute("http://example.com/").await;
    assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    assert_eq!(fetcher.call_count(), 0);
}
