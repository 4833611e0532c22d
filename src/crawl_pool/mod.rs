//! Concurrent crawl orchestration: queue workers, per-domain limiting,
//! circuit breaking on repeatedly failing domains, and a retry queue for
//! domains waiting to recover.

mod circuit_breaker;
mod domain_limiter;
mod pool;
mod retry_queue;

pub use circuit_breaker::{CircuitBreaker, CircuitState, DomainHealth};
pub use domain_limiter::DomainLimiter;
pub use pool::CrawlPool;
pub use retry_queue::RetryQueue;
