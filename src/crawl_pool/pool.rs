//! Worker-pool orchestration: drains the crawl queue concurrently,
//! feeding fetched pages through the extractor into a shared aggregation,
//! with per-domain limiting, circuit breaking, and optional adaptive
//! concurrency.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::events::{CrawlEvent, EventBus};
use crate::extractor;
use crate::fetch::FetchClient;
use crate::model::{CrawlTask, ScrapedData};
use crate::queue::CrawlQueue;
use crate::utils::constants::{
    ADAPTIVE_CONCURRENCY_POLL_SECS, ADAPTIVE_CONCURRENCY_QUEUE_TRIGGER, ADAPTIVE_CONCURRENCY_STEP,
    CIRCUIT_BREAKER_FAILURE_THRESHOLD, CIRCUIT_BREAKER_HALF_OPEN_TIMEOUT_SECS, CIRCUIT_BREAKER_SUCCESS_THRESHOLD,
    MAX_CRAWL_WORKERS, QUEUE_GET_TIMEOUT_MS,
};

use super::circuit_breaker::{extract_domain, CircuitBreaker};
use super::domain_limiter::DomainLimiter;
use super::retry_queue::RetryQueue;

/// Shared handles a worker needs to pop tasks, fetch, extract, and
/// record outcomes. Cheap to clone: every field is an `Arc` or similar.
#[derive(Clone)]
struct WorkerContext {
    client: Arc<FetchClient>,
    queue: Arc<CrawlQueue>,
    circuit_breaker: Arc<CircuitBreaker>,
    domain_limiter: Arc<DomainLimiter>,
    retry_queue: Arc<RetryQueue>,
    results: Arc<Mutex<ScrapedData>>,
    events: EventBus,
    stop: Arc<AtomicBool>,
    max_depth: u8,
}

/// A single crawl run: owns the queue, the shared aggregation, and the
/// concurrency-control primitives workers share.
pub struct CrawlPool {
    catalog: Arc<Catalog>,
    events: EventBus,
    ctx: WorkerContext,
}

impl CrawlPool {
    #[must_use]
    pub fn new(client: Arc<FetchClient>, catalog: Arc<Catalog>, events: EventBus, max_depth: u8, max_concurrent_per_domain: usize) -> Self {
        let circuit_breaker = Arc::new(CircuitBreaker::new(
            CIRCUIT_BREAKER_FAILURE_THRESHOLD,
            CIRCUIT_BREAKER_SUCCESS_THRESHOLD,
            Duration::from_secs(CIRCUIT_BREAKER_HALF_OPEN_TIMEOUT_SECS),
        ));
        let ctx = WorkerContext {
            client,
            queue: Arc::new(CrawlQueue::new()),
            retry_queue: Arc::new(RetryQueue::new(circuit_breaker.clone())),
            circuit_breaker,
            domain_limiter: Arc::new(DomainLimiter::new(max_concurrent_per_domain)),
            results: Arc::new(Mutex::new(ScrapedData::default())),
            events: events.clone(),
            stop: Arc::new(AtomicBool::new(false)),
            max_depth,
        };
        Self { catalog, events, ctx }
    }

    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.ctx.stop.clone()
    }

    /// Request cooperative shutdown: workers finish their current fetch,
    /// then exit; queued-but-unstarted tasks are dropped.
    pub async fn cancel(&self) {
        self.ctx.stop.store(true, Ordering::SeqCst);
        self.ctx.queue.clear().await;
    }

    /// Run the crawl to completion: seed the queue, spawn `workers`
    /// workers (clamped to `[1, MAX_CRAWL_WORKERS]`), optionally grow the
    /// pool under load, and return the final aggregation once the queue
    /// drains.
    pub async fn run(&self, seed_url: &str, workers: usize, adaptive: bool) -> ScrapedData {
        let task_id = self.catalog.create_task(seed_url, std::path::Path::new("")).await;
        self.ctx.results.lock().await.source_url = seed_url.to_string();
        self.ctx.queue.put(CrawlTask::seed(seed_url)).await;
        self.events.publish(CrawlEvent::Started { seed_url: seed_url.to_string() });

        let worker_count = Arc::new(AtomicUsize::new(workers.clamp(1, MAX_CRAWL_WORKERS)));
        let mut handles: Vec<tokio::task::JoinHandle<()>> = Vec::new();
        for _ in 0..worker_count.load(Ordering::SeqCst) {
            handles.push(tokio::spawn(run_worker(self.ctx.clone())));
        }

        let adaptive_handle = adaptive.then(|| self.spawn_adaptive_concurrency(worker_count));

        loop {
            if self.ctx.stop.load(Ordering::SeqCst) {
                break;
            }
            if self.ctx.queue.is_empty().await && self.ctx.queue.unfinished().await == 0 && self.ctx.retry_queue.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        self.ctx.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = adaptive_handle {
            handle.abort();
        }
        for handle in handles {
            let _ = handle.await;
        }

        let results = self.ctx.results.lock().await.clone();
        self.catalog.update_task_progress(task_id, 0, results.total_count() as i64).await;
        self.catalog.update_task_status(task_id, "scanned", true).await;
        self.events.publish(CrawlEvent::CrawlFinished { results: results.clone() });
        results
    }

    /// Every `ADAPTIVE_CONCURRENCY_POLL_SECS`, grow the pool by
    /// `ADAPTIVE_CONCURRENCY_STEP` (capped at `MAX_CRAWL_WORKERS`) while
    /// the queue backlog exceeds `ADAPTIVE_CONCURRENCY_QUEUE_TRIGGER`.
    /// Newly spawned workers exit on their own once the stop flag is set,
    /// so they are not tracked for joining.
    fn spawn_adaptive_concurrency(&self, worker_count: Arc<AtomicUsize>) -> tokio::task::JoinHandle<()> {
        let ctx = self.ctx.clone();
        let stop = self.ctx.stop.clone();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(ADAPTIVE_CONCURRENCY_POLL_SECS)).await;
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                let current = worker_count.load(Ordering::SeqCst);
                if ctx.queue.size().await > ADAPTIVE_CONCURRENCY_QUEUE_TRIGGER && current < MAX_CRAWL_WORKERS {
                    let to_add = ADAPTIVE_CONCURRENCY_STEP.min(MAX_CRAWL_WORKERS - current);
                    worker_count.fetch_add(to_add, Ordering::SeqCst);
                    log::info!("adaptive concurrency: adding {to_add} workers ({current} -> {})", current + to_add);
                    for _ in 0..to_add {
                        tokio::spawn(run_worker(ctx.clone()));
                    }
                }
            }
        })
    }
}

/// One worker's lifetime: pop, fetch, extract, record, repeat until the
/// stop flag is set.
async fn run_worker(ctx: WorkerContext) {
    loop {
        if ctx.stop.load(Ordering::SeqCst) {
            return;
        }

        for ready in ctx.retry_queue.drain_ready() {
            ctx.queue.put(ready).await;
        }

        let task = match ctx.queue.get(Duration::from_millis(QUEUE_GET_TIMEOUT_MS)).await {
            Some(task) => task,
            None => continue,
        };

        let domain = extract_domain(&task.url).ok();
        if let Some(domain) = &domain {
            if !ctx.circuit_breaker.should_attempt(domain) {
                ctx.retry_queue.add(task);
                ctx.queue.task_done(false).await;
                continue;
            }
        }

        let _permit = match &domain {
            Some(domain) => Some(ctx.domain_limiter.acquire(domain.clone()).await),
            None => None,
        };

        let success = process_task(&ctx.client, &task, ctx.max_depth, &ctx.queue, &ctx.results, &ctx.events).await;

        if let Some(domain) = &domain {
            if success {
                ctx.circuit_breaker.record_success(domain);
            } else {
                ctx.circuit_breaker.record_failure(domain, "fetch failed");
            }
        }

        ctx.queue.task_done(success).await;
        let stats = ctx.queue.get_stats().await;
        ctx.events.publish(CrawlEvent::Progress {
            done: (stats.completed + stats.failed) as usize,
            total: stats.total_queued as usize,
        });
    }
}

async fn process_task(
    client: &FetchClient,
    task: &CrawlTask,
    max_depth: u8,
    queue: &CrawlQueue,
    results: &Mutex<ScrapedData>,
    events: &EventBus,
) -> bool {
    let page = match client.get(&task.url, task.referer.as_deref()).await {
        Ok(page) => page,
        Err(e) => {
            events.log(format!("fetch failed for {}: {e}", task.url));
            return false;
        }
    };

    let extracted = extractor::extract(&page.body, &page.content_type, &page.final_url, page.status);

    {
        let mut guard = results.lock().await;
        for (category, resource) in extracted.resources {
            guard.add(category, resource);
        }
    }

    if task.depth < max_depth {
        for link in extracted.pagination_links {
            queue.put(CrawlTask::child(link, task.depth + 1, task.url.clone())).await;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_page_crawl_reaches_completion() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body><img src=\"/a.jpg\"></body></html>")
            .create_async()
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let client = Arc::new(FetchClient::new(None, false).unwrap());
        let catalog = Arc::new(Catalog::open(&dir.path().join("c.sqlite")).await.unwrap());
        let pool = CrawlPool::new(client, catalog, EventBus::new(), 2, 2);

        let results = pool.run(&server.url(), 2, false).await;
        assert!(!results.images.is_empty());
    }
}
