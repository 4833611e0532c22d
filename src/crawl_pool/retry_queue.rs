//! Retry queue for tasks rejected by an open circuit breaker.
//!
//! Tasks are preserved here instead of being dropped. When a domain's
//! circuit transitions out of Open, its tasks are drained back to the
//! main crawl queue.

use dashmap::DashMap;
use std::sync::Arc;

use super::circuit_breaker::{extract_domain, CircuitBreaker};
use crate::model::CrawlTask;

pub struct RetryQueue {
    items: DashMap<String, Vec<CrawlTask>>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl RetryQueue {
    #[must_use]
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            items: DashMap::new(),
            circuit_breaker,
        }
    }

    pub fn add(&self, task: CrawlTask) {
        if let Ok(domain) = extract_domain(&task.url) {
            self.items.entry(domain).or_default().push(task);
        }
    }

    /// Drain tasks whose domain's circuit is now Closed or `HalfOpen`.
    pub fn drain_ready(&self) -> Vec<CrawlTask> {
        let ready_domains: Vec<String> = self
            .items
            .iter()
            .filter(|entry| self.circuit_breaker.should_attempt(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut ready = Vec::new();
        for domain in ready_domains {
            if let Some((_, tasks)) = self.items.remove(&domain) {
                log::info!("circuit recovery: re-queueing {} tasks for {domain}", tasks.len());
                ready.extend(tasks);
            }
        }
        ready
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.iter().map(|e| e.value().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn add_groups_tasks_by_domain() {
        let cb = Arc::new(CircuitBreaker::new(3, 2, Duration::from_secs(60)));
        let retry = RetryQueue::new(cb);
        retry.add(CrawlTask::seed("https://a.com/1"));
        retry.add(CrawlTask::seed("https://a.com/2"));
        retry.add(CrawlTask::seed("https://b.com/1"));
        assert_eq!(retry.len(), 3);
    }

    #[test]
    fn drain_ready_only_returns_recovered_domains() {
        let cb = Arc::new(CircuitBreaker::new(1, 1, Duration::from_secs(60)));
        let retry = RetryQueue::new(cb.clone());
        cb.record_failure("a.com", "boom");
        retry.add(CrawlTask::seed("https://a.com/1"));
        retry.add(CrawlTask::seed("https://b.com/1"));

        let drained = retry.drain_ready();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].url, "https://b.com/1");
        assert_eq!(retry.len(), 1);
    }
}
