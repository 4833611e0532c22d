//! Error types for the crawl and download pipeline.
//!
//! A hand-written, caller-inspectable enum for the terminal error kinds
//! surfaced at component boundaries (`CrawlError`), plus small
//! `thiserror`-derived enums for narrower boundaries (config validation,
//! catalog setup) where the derive pulls its weight.

use std::fmt;

/// Terminal, caller-inspectable error kinds surfaced at component
/// boundaries (Controller, CrawlPool, DownloadPool).
#[derive(Debug, Clone)]
pub enum CrawlError {
    InvalidInput(String),
    NetworkError(String),
    HttpError(u16, String),
    ParseError(String),
    StorageError(String),
    DiskSpaceError(String),
    Cancelled,
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NetworkError(msg) => write!(f, "network error: {msg}"),
            Self::HttpError(status, msg) => write!(f, "http error {status}: {msg}"),
            Self::ParseError(msg) => write!(f, "parse error: {msg}"),
            Self::StorageError(msg) => write!(f, "storage error: {msg}"),
            Self::DiskSpaceError(msg) => write!(f, "disk space error: {msg}"),
            Self::Cancelled => write!(f, "operation was cancelled"),
        }
    }
}

impl std::error::Error for CrawlError {}

impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        Self::StorageError(format!("{err:#}"))
    }
}

impl From<reqwest::Error> for CrawlError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::HttpError(status.as_u16(), err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

pub type CrawlResult<T> = Result<T, CrawlError>;

/// Configuration build-time validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("start URL is missing or invalid: {0}")]
    InvalidStartUrl(String),
    #[error("max_depth must be at least 1")]
    InvalidMaxDepth,
    #[error("crawl worker count must be between {min} and {max}, got {actual}")]
    InvalidWorkerCount {
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("storage directory could not be created: {0}")]
    StorageDirUnavailable(String),
}

/// Catalog setup/connection errors. Per-call operations on an open
/// catalog are expected to log and swallow errors (see `catalog::Catalog`)
/// rather than propagate this type; this is only for `Catalog::open`.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("schema migration failed: {0}")]
    Migration(#[source] sqlx::Error),
    #[error("integrity check failed: {0}")]
    IntegrityCheck(String),
}
