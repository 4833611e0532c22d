//! Public façade over a crawl/download run: owns the active catalog task,
//! enforces the Idle/Crawling/Downloading state machine, and republishes
//! every subsystem's events on one bus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::config::{CrawlConfig, DownloadConfig};
use crate::crawl_pool::CrawlPool;
use crate::download::DownloadPool;
use crate::error::{CrawlError, CrawlResult};
use crate::events::{CrawlEvent, EventBus};
use crate::fetch::FetchClient;
use crate::model::{ResourceCategory, ScrapedData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Crawling,
    Downloading,
}

/// Owns the single active run (crawl or download) at a time, dispatches
/// work to `CrawlPool`/`DownloadPool`, and exposes one event stream.
pub struct Controller {
    catalog: Arc<Catalog>,
    events: EventBus,
    state: Mutex<RunState>,
    last_results: Mutex<ScrapedData>,
    active_stop: Mutex<Option<Arc<AtomicBool>>>,
}

impl Controller {
    pub async fn new(storage_dir: &std::path::Path) -> CrawlResult<Self> {
        let db_path = crate::catalog::default_db_path(storage_dir);
        let catalog = Catalog::open(&db_path)
            .await
            .map_err(|e| CrawlError::StorageError(e.to_string()))?;
        Ok(Self {
            catalog: Arc::new(catalog),
            events: EventBus::new(),
            state: Mutex::new(RunState::Idle),
            last_results: Mutex::new(ScrapedData::default()),
            active_stop: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub async fn state(&self) -> RunState {
        *self.state.lock().await
    }

    /// Start a crawl from `config`. Fails if a crawl or download is
    /// already active.
    pub async fn start_crawl(&self, config: &CrawlConfig) -> CrawlResult<ScrapedData> {
        {
            let mut state = self.state.lock().await;
            if *state != RunState::Idle {
                return Err(CrawlError::InvalidInput("a run is already active".to_string()));
            }
            *state = RunState::Crawling;
        }

        let client = Arc::new(FetchClient::new(config.proxy(), true)?);
        let pool = CrawlPool::new(
            client,
            self.catalog.clone(),
            self.events.clone(),
            config.max_depth(),
            config.max_concurrent_per_domain(),
        );
        *self.active_stop.lock().await = Some(pool.stop_flag());

        let results = pool.run(config.start_url(), config.workers(), config.adaptive_concurrency()).await;
        *self.last_results.lock().await = results.clone();
        self.events.publish(CrawlEvent::ResultsUpdated { snapshot: results.clone() });

        *self.active_stop.lock().await = None;
        *self.state.lock().await = RunState::Idle;
        Ok(results)
    }

    /// Start a download of `categories` from the most recent crawl's
    /// aggregation, into `output_dir`. Fails if a crawl or download is
    /// already active, or if nothing has been crawled yet.
    pub async fn start_download(
        &self,
        categories: &[ResourceCategory],
        config: &DownloadConfig,
    ) -> CrawlResult<(usize, usize)> {
        {
            let mut state = self.state.lock().await;
            if *state != RunState::Idle {
                return Err(CrawlError::InvalidInput("a run is already active".to_string()));
            }
            *state = RunState::Downloading;
        }

        let resources = self.last_results.lock().await.resources_in_categories(categories);
        if resources.is_empty() {
            *self.state.lock().await = RunState::Idle;
            return Ok((0, 0));
        }

        if categories.contains(&ResourceCategory::HlsPlaylists)
            && !crate::hls_merger::is_available(config.merger_binary()).await
        {
            log::warn!(
                "merger binary '{}' not available; HLS playlists will download as individual segments",
                config.merger_binary()
            );
        }

        let client = Arc::new(FetchClient::new(None, true)?);
        let stop = Arc::new(AtomicBool::new(false));
        *self.active_stop.lock().await = Some(stop.clone());

        let pool = DownloadPool::new(client, self.catalog.clone(), self.events.clone(), config.workers());
        let task_id = self
            .catalog
            .create_task(&self.last_results.lock().await.source_url.clone(), config.output_dir())
            .await;

        let outcome = pool.run(task_id, resources, config.output_dir(), stop).await;

        *self.active_stop.lock().await = None;
        *self.state.lock().await = RunState::Idle;
        Ok(outcome)
    }

    /// Idempotent: signals the active run (if any) to stop. Returns
    /// immediately; does not await run completion.
    pub async fn cancel(&self) {
        if let Some(stop) = self.active_stop.lock().await.as_ref() {
            stop.store(true, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_controller_starts_idle() {
        let dir = tempfile::TempDir::new().unwrap();
        let controller = Controller::new(dir.path()).await.unwrap();
        assert_eq!(controller.state().await, RunState::Idle);
    }

    #[tokio::test]
    async fn download_with_no_prior_crawl_is_a_no_op() {
        let dir = tempfile::TempDir::new().unwrap();
        let controller = Controller::new(dir.path()).await.unwrap();
        let config = DownloadConfig::new(dir.path().join("out"));
        let (success, total) = controller
            .start_download(&ResourceCategory::ALL, &config)
            .await
            .unwrap();
        assert_eq!((success, total), (0, 0));
        assert_eq!(controller.state().await, RunState::Idle);
    }
}
