use futures::future::join_all;
use guarded_fetch_application::services::{InflightDeduplicator, ResultCache};
use guarded_fetch_domain::FetchError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn make_dedup(max_entries: usize) -> Arc<InflightDeduplicator<String>> {
    let cache = Arc::new(ResultCache::new("test", 100, Duration::from_secs(60)));
    Arc::new(InflightDeduplicator::new(
        cache,
        max_entries,
        Duration::from_secs(5),
    ))
}

fn counting_producer(
    counter: &Arc<AtomicUsize>,
    delay: Duration,
    value: &str,
) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<String, FetchError>> {
    let counter = Arc::clone(counter);
    let value = value.to_string();
    move || {
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Ok(value)
        })
    }
}

#[tokio::test]
async fn test_concurrent_callers_share_one_producer() {
    let dedup = make_dedup(10);
    let counter = Arc::new(AtomicUsize::new(0));
    let started = Instant::now();

    let calls = (0..5).map(|_| {
        let dedup = Arc::clone(&dedup);
        let producer = counting_producer(&counter, Duration::from_millis(100), "value");
        async move { dedup.get("k", producer).await }
    });
    let results = join_all(calls).await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.unwrap(), "value");
    }
    assert!(
        started.elapsed() < Duration::from_millis(400),
        "callers should not run sequentially: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_success_is_cached_for_later_callers() {
    let dedup = make_dedup(10);
    let counter = Arc::new(AtomicUsize::new(0));

    let first = dedup
        .get("k", counting_producer(&counter, Duration::ZERO, "v1"))
        .await
        .unwrap();
    let second = dedup
        .get("k", counting_producer(&counter, Duration::ZERO, "v2"))
        .await
        .unwrap();

    assert_eq!(first, "v1");
    assert_eq!(second, "v1");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(dedup.cache().get("k").as_deref(), Some("v1"));
}

#[tokio::test]
async fn test_distinct_keys_run_independently() {
    let dedup = make_dedup(10);
    let counter = Arc::new(AtomicUsize::new(0));

    let a = dedup.get("a", counting_producer(&counter, Duration::from_millis(20), "A"));
    let b = dedup.get("b", counting_producer(&counter, Duration::from_millis(20), "B"));
    let (a, b) = tokio::join!(a, b);

    assert_eq!(a.unwrap(), "A");
    assert_eq!(b.unwrap(), "B");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_error_is_shared_and_not_cached() {
    let dedup = make_dedup(10);
    let counter = Arc::new(AtomicUsize::new(0));

    let calls = (0..3).map(|_| {
        let dedup = Arc::clone(&dedup);
        let counter = Arc::clone(&counter);
        async move {
            dedup
                .get("k", move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err::<String, _>(FetchError::MalformedContent("bad".to_string()))
                })
                .await
        }
    });
    let results = join_all(calls).await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(
            result,
            Err(FetchError::MalformedContent("bad".to_string()))
        );
    }

    let retry = dedup
        .get("k", counting_producer(&counter, Duration::ZERO, "ok"))
        .await;
    assert_eq!(retry.unwrap(), "ok");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timeout_rejects_every_waiter_and_frees_the_key() {
    let dedup = make_dedup(10);
    let counter = Arc::new(AtomicUsize::new(0));

    let calls = (0..3).map(|_| {
        let dedup = Arc::clone(&dedup);
        let counter = Arc::clone(&counter);
        async move {
            dedup
                .get_with_timeout("slow", Duration::from_millis(50), move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    std::future::pending::<Result<String, FetchError>>().await
                })
                .await
        }
    });
    let results = join_all(calls).await;

    for result in results {
        assert_eq!(result, Err(FetchError::Timeout { after_ms: 50 }));
    }

    let fresh = dedup
        .get("slow", counting_producer(&counter, Duration::ZERO, "done"))
        .await;
    assert_eq!(fresh.unwrap(), "done");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_call_right_after_timeout_starts_fresh_producer() {
    let dedup = make_dedup(10);

    for round in 0..200 {
        let key = format!("k{round}");
        let timed_out = dedup
            .get_with_timeout(&key, Duration::from_millis(1), || {
                std::future::pending::<Result<String, FetchError>>()
            })
            .await;
        assert_eq!(timed_out, Err(FetchError::Timeout { after_ms: 1 }));

        let counter = Arc::new(AtomicUsize::new(0));
        let fresh = dedup
            .get(&key, counting_producer(&counter, Duration::ZERO, "fresh"))
            .await;
        assert_eq!(fresh.as_deref(), Ok("fresh"), "round {round}");
        assert_eq!(counter.load(Ordering::SeqCst), 1, "round {round}");
    }
}

#[tokio::test]
async fn test_leader_miss_is_counted_once() {
    let dedup = make_dedup(10);
    let counter = Arc::new(AtomicUsize::new(0));

    dedup
        .get("k", counting_producer(&counter, Duration::ZERO, "v"))
        .await
        .unwrap();
    dedup
        .get("k", counting_producer(&counter, Duration::ZERO, "v"))
        .await
        .unwrap();

    let stats = dedup.cache().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

async fn wait_until_idle(dedup: &InflightDeduplicator<String>) -> bool {
    // a panicking producer releases its slot while unwinding
    for _ in 0..20 {
        if dedup.in_flight() == 0 {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test]
async fn test_capacity_rejects_new_keys_immediately() {
    let dedup = make_dedup(1);
    let counter = Arc::new(AtomicUsize::new(0));

    let holder = {
        let dedup = Arc::clone(&dedup);
        let producer = counting_producer(&counter, Duration::from_millis(100), "held");
        tokio::spawn(async move { dedup.get("first", producer).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(dedup.in_flight(), 1);

    let started = Instant::now();
    let rejected = dedup
        .get("second", counting_producer(&counter, Duration::ZERO, "never"))
        .await;
    assert_eq!(rejected, Err(FetchError::TooManyInFlight { limit: 1 }));
    assert!(started.elapsed() < Duration::from_millis(50));

    // joining the running key is still allowed at capacity
    let joined = dedup
        .get("first", counting_producer(&counter, Duration::ZERO, "other"))
        .await;
    assert_eq!(joined.unwrap(), "held");

    assert_eq!(holder.await.unwrap().unwrap(), "held");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_producer_panic_frees_slot_and_reports_internal() {
    let dedup = make_dedup(1);

    let result = dedup
        .get("boom", || async {
            if true {
                panic!("producer exploded");
            }
            Ok::<String, FetchError>(String::new())
        })
        .await;
    assert!(matches!(result, Err(FetchError::Internal(_))));

    assert!(wait_until_idle(&dedup).await);
    let counter = Arc::new(AtomicUsize::new(0));
    let after = dedup
        .get("boom", counting_producer(&counter, Duration::ZERO, "recovered"))
        .await;
    assert_eq!(after.unwrap(), "recovered");
}

#[tokio::test]
async fn test_producer_finishes_when_caller_goes_away() {
    let dedup = make_dedup(10);
    let counter = Arc::new(AtomicUsize::new(0));

    let caller = {
        let dedup = Arc::clone(&dedup);
        let producer = counting_producer(&counter, Duration::from_millis(50), "kept");
        tokio::spawn(async move { dedup.get("k", producer).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    caller.abort();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(dedup.cache().get("k").as_deref(), Some("kept"));
    assert_eq!(dedup.in_flight(), 0);
}
