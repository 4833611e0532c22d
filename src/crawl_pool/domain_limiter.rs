//! Per-domain concurrency limiter, so crawling many domains at once
//! doesn't slam any single host.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct DomainLimiter {
    domain_semaphores: DashMap<String, Arc<Semaphore>>,
    max_per_domain: usize,
}

impl DomainLimiter {
    #[must_use]
    pub fn new(max_per_domain: usize) -> Self {
        Self {
            domain_semaphores: DashMap::new(),
            max_per_domain,
        }
    }

    /// Acquire a permit for `domain`, lazily creating its semaphore.
    pub async fn acquire(&self, domain: String) -> OwnedSemaphorePermit {
        loop {
            let semaphore = self
                .domain_semaphores
                .entry(domain.clone())
                .or_insert_with(|| Arc::new(Semaphore::new(self.max_per_domain)))
                .clone();

            if let Ok(permit) = semaphore.acquire_owned().await {
                return permit;
            }

            log::error!("semaphore for domain '{domain}' closed unexpectedly, replacing");
            self.domain_semaphores.insert(domain.clone(), Arc::new(Semaphore::new(self.max_per_domain)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn separate_domains_get_separate_semaphores() {
        let limiter = DomainLimiter::new(1);
        let _a = limiter.acquire("a.com".to_string()).await;
        let permit_b = tokio::time::timeout(std::time::Duration::from_millis(50), limiter.acquire("b.com".to_string())).await;
        assert!(permit_b.is_ok());
    }

    #[tokio::test]
    async fn same_domain_blocks_beyond_limit() {
        let limiter = DomainLimiter::new(1);
        let _permit = limiter.acquire("a.com".to_string()).await;
        let second = tokio::time::timeout(std::time::Duration::from_millis(50), limiter.acquire("a.com".to_string())).await;
        assert!(second.is_err());
    }
}
