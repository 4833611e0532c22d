//! Shared configuration constants for sitecrawl
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default maximum crawl depth: seed page is depth 1.
pub const DEFAULT_MAX_DEPTH: u8 = 3;

/// Worker-count clamp bounds for `CrawlPool`.
pub const MIN_CRAWL_WORKERS: usize = 1;
pub const MAX_CRAWL_WORKERS: usize = 20;

/// Suggested default worker count: `clamp(5, 10, 2 * cpu_count)`.
#[must_use]
pub fn default_crawl_workers() -> usize {
    (2 * num_cpus::get()).clamp(5, 10)
}

/// Default number of concurrent download workers.
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 5;

/// `FetchClient` retry policy: total retries and exponential backoff factor.
pub const FETCH_MAX_RETRIES: u32 = 3;
pub const FETCH_BACKOFF_FACTOR_SECS: f64 = 0.5;

/// `FetchClient` default request timeouts.
pub const FETCH_DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const FETCH_HEAD_TIMEOUT_SECS: u64 = 5;
pub const FETCH_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Download retry policy: up to 3 retries with linear backoff
/// `retry_delay * (attempt + 1)`, base 2s (4 attempts total).
pub const DOWNLOAD_MAX_RETRIES: u32 = 3;
pub const DOWNLOAD_RETRY_BASE_SECS: u64 = 2;

/// Streamed download chunk size.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// Disk-space preflight reserve and minimum requirement.
pub const DISK_SPACE_RESERVE_BYTES: u64 = 50 * 1024 * 1024;
pub const DISK_SPACE_MIN_BYTES: u64 = 10 * 1024 * 1024;

/// Cached-skip tolerance: local/remote content-length difference, in bytes.
pub const CACHE_SIZE_TOLERANCE_BYTES: i64 = 100;

/// Filename derivation: max title length before falling back to URL basename.
pub const MAX_TITLE_FILENAME_LEN: usize = 100;

/// Circuit breaker defaults.
pub const CIRCUIT_BREAKER_FAILURE_THRESHOLD: u32 = 5;
pub const CIRCUIT_BREAKER_SUCCESS_THRESHOLD: u32 = 2;
pub const CIRCUIT_BREAKER_HALF_OPEN_TIMEOUT_SECS: u64 = 300;

/// Adaptive concurrency: poll interval, queue-size trigger, and step size.
pub const ADAPTIVE_CONCURRENCY_POLL_SECS: u64 = 2;
pub const ADAPTIVE_CONCURRENCY_QUEUE_TRIGGER: usize = 50;
pub const ADAPTIVE_CONCURRENCY_STEP: usize = 5;

/// `CrawlQueue` blocking-get poll timeout.
pub const QUEUE_GET_TIMEOUT_MS: u64 = 500;

/// External HLS merger invocation timeout.
pub const HLS_MERGE_TIMEOUT_SECS: u64 = 300;
pub const FFMPEG_CHECK_TIMEOUT_SECS: u64 = 5;

/// Default per-domain concurrency limit.
pub const DEFAULT_MAX_CONCURRENT_PER_DOMAIN: usize = 2;

/// A small rotating pool of realistic desktop browser User-Agent strings.
/// Stands in for a network-fetched UA database (out of scope).
pub const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

/// CSRF token field names checked in priority order during login-form scraping.
pub const CSRF_FIELD_NAMES: &[&str] = &[
    "csrf_token",
    "csrfmiddlewaretoken",
    "_token",
    "authenticity_token",
    "_csrf",
    "csrf",
    "__RequestVerificationToken",
    "XSRF-TOKEN",
];

/// Substrings that indicate a failed login when found in a response body.
pub const LOGIN_FAILURE_MARKERS: &[&str] = &[
    "invalid",
    "incorrect",
    "wrong password",
    "login failed",
    "authentication failed",
    "error",
    "用户名或密码错误",
];
