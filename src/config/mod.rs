//! Crawl and download configuration.
//!
//! Plain chained-setter builders validated in a single `build()` call,
//! rather than a compile-time typestate — this crate's configuration
//! surface is narrow enough that per-field phantom markers would only
//! add ceremony.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::utils::constants::{
    default_crawl_workers, DEFAULT_DOWNLOAD_WORKERS, DEFAULT_MAX_CONCURRENT_PER_DOMAIN, DEFAULT_MAX_DEPTH,
    MAX_CRAWL_WORKERS, MIN_CRAWL_WORKERS,
};

/// Settings governing a single crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    start_url: String,
    storage_dir: PathBuf,
    max_depth: u8,
    workers: usize,
    max_concurrent_per_domain: usize,
    proxy: Option<String>,
    adaptive_concurrency: bool,
}

/// Builder for `CrawlConfig`. Call `build()` to validate and finalize.
#[derive(Debug, Clone, Default)]
pub struct CrawlConfigBuilder {
    start_url: Option<String>,
    storage_dir: Option<PathBuf>,
    max_depth: u8,
    workers: Option<usize>,
    max_concurrent_per_domain: usize,
    proxy: Option<String>,
    adaptive_concurrency: bool,
}

impl CrawlConfigBuilder {
    #[must_use]
    pub fn new(start_url: impl Into<String>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            start_url: Some(start_url.into()),
            storage_dir: Some(storage_dir.into()),
            max_depth: DEFAULT_MAX_DEPTH,
            workers: None,
            max_concurrent_per_domain: DEFAULT_MAX_CONCURRENT_PER_DOMAIN,
            proxy: None,
            adaptive_concurrency: false,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: u8) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    #[must_use]
    pub fn with_max_concurrent_per_domain(mut self, n: usize) -> Self {
        self.max_concurrent_per_domain = n;
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    #[must_use]
    pub fn with_adaptive_concurrency(mut self, enabled: bool) -> Self {
        self.adaptive_concurrency = enabled;
        self
    }

    pub fn build(self) -> Result<CrawlConfig, ConfigError> {
        let start_url = self.start_url.ok_or_else(|| ConfigError::InvalidStartUrl("missing".to_string()))?;
        url::Url::parse(&start_url).map_err(|e| ConfigError::InvalidStartUrl(format!("{start_url}: {e}")))?;

        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth);
        }

        let workers = self.workers.unwrap_or_else(default_crawl_workers);
        if !(MIN_CRAWL_WORKERS..=MAX_CRAWL_WORKERS).contains(&workers) {
            return Err(ConfigError::InvalidWorkerCount {
                min: MIN_CRAWL_WORKERS,
                max: MAX_CRAWL_WORKERS,
                actual: workers,
            });
        }

        let storage_dir = self
            .storage_dir
            .ok_or_else(|| ConfigError::StorageDirUnavailable("missing".to_string()))?;

        Ok(CrawlConfig {
            start_url,
            storage_dir,
            max_depth: self.max_depth,
            workers,
            max_concurrent_per_domain: self.max_concurrent_per_domain,
            proxy: self.proxy,
            adaptive_concurrency: self.adaptive_concurrency,
        })
    }
}

impl CrawlConfig {
    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    #[must_use]
    pub fn storage_dir(&self) -> &PathBuf {
        &self.storage_dir
    }

    #[must_use]
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn max_concurrent_per_domain(&self) -> usize {
        self.max_concurrent_per_domain
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    #[must_use]
    pub fn adaptive_concurrency(&self) -> bool {
        self.adaptive_concurrency
    }
}

/// Settings governing a single download run.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    output_dir: PathBuf,
    workers: usize,
    merger_binary: String,
}

impl DownloadConfig {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            workers: DEFAULT_DOWNLOAD_WORKERS,
            merger_binary: "ffmpeg".to_string(),
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_merger_binary(mut self, binary: impl Into<String>) -> Self {
        self.merger_binary = binary.into();
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn merger_binary(&self) -> &str {
        &self.merger_binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_invalid_url() {
        let result = CrawlConfigBuilder::new("not a url", "/tmp/out").build();
        assert!(matches!(result, Err(ConfigError::InvalidStartUrl(_))));
    }

    #[test]
    fn build_rejects_zero_depth() {
        let result = CrawlConfigBuilder::new("https://example.com", "/tmp/out")
            .with_max_depth(0)
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidMaxDepth)));
    }

    #[test]
    fn build_rejects_worker_count_out_of_range() {
        let result = CrawlConfigBuilder::new("https://example.com", "/tmp/out")
            .with_workers(50)
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidWorkerCount { .. })));
    }

    #[test]
    fn build_succeeds_with_defaults() {
        let config = CrawlConfigBuilder::new("https://example.com", "/tmp/out").build().unwrap();
        assert_eq!(config.start_url(), "https://example.com");
        assert!(config.workers() >= MIN_CRAWL_WORKERS);
    }
}
