use async_trait::async_trait;
use guarded_fetch_application::ports::HostResolver;
use guarded_fetch_domain::FetchError;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Answers from a fixed table; each host can hold a queue of answers to
/// simulate records changing between lookups.
#[derive(Default)]
pub struct MockHostResolver {
    answers: Mutex<HashMap<String, Vec<Vec<IpAddr>>>>,
    call_count: Arc<AtomicUsize>,
}

impl MockHostResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(self, host: &str, addresses: &[&str]) -> Self {
        self.push_answer(host, addresses);
        self
    }

    pub fn push_answer(&self, host: &str, addresses: &[&str]) {
        let parsed = addresses.iter().map(|a| a.parse().unwrap()).collect();
        self.answers
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_default()
            .push(parsed);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostResolver for MockHostResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, FetchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        let queue = answers
            .get_mut(host)
            .ok_or_else(|| FetchError::ResolutionFailed {
                host: host.to_string(),
                reason: "NXDOMAIN".to_string(),
            })?;
        // the last answer sticks once the queue is drained
        if queue.len() > 1 {
            Ok(queue.remove(0))
        } else {
            Ok(queue.first().cloned().unwrap_or_default())
        }
    }
}
