//! Shared helpers for integration tests: temp storage dirs and a thin
//! wrapper around building a `CrawlConfig` pointed at a mock server.

#![allow(dead_code)]

use sitecrawl::{CrawlConfig, CrawlConfigBuilder};
use tempfile::TempDir;

pub fn storage_dir() -> TempDir {
    TempDir::new().expect("create temp storage dir")
}

pub fn crawl_config(seed_url: &str, storage: &TempDir, max_depth: u8) -> CrawlConfig {
    CrawlConfigBuilder::new(seed_url.to_string(), storage.path().to_path_buf())
        .with_max_depth(max_depth)
        .with_workers(2)
        .build()
        .expect("valid crawl config")
}
