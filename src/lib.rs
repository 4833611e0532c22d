//! Concurrent web resource crawler and downloader: crawl a seed page for
//! media/document links within a depth bound, then selectively download
//! them with retries and a persistent catalog.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod controller;
pub mod crawl_pool;
pub mod download;
pub mod error;
pub mod events;
pub mod extractor;
pub mod fetch;
pub mod hls_merger;
pub mod model;
pub mod queue;
pub mod utils;

pub use catalog::Catalog;
pub use config::{CrawlConfig, CrawlConfigBuilder, DownloadConfig};
pub use controller::{Controller, RunState};
pub use error::{CrawlError, CrawlResult};
pub use events::{CrawlEvent, EventBus};
pub use model::{CrawlTask, Priority, Resource, ResourceCategory, ResourceStatus, ResourceType, ScrapedData};
