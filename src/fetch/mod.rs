//! HTTP client with anti-scraping features: per-request UA rotation,
//! HTTP/HTTPS/SOCKS5 proxy support, CSRF-aware login, and exponential
//! backoff retry on transient failure.

mod csrf;

use std::time::Duration;

use rand::seq::IndexedRandom;
use reqwest::{Client, Proxy, Response};
use scraper::Html;

use crate::error::{CrawlError, CrawlResult};
use crate::utils::constants::{
    FETCH_BACKOFF_FACTOR_SECS, FETCH_DEFAULT_TIMEOUT_SECS, FETCH_DOWNLOAD_TIMEOUT_SECS,
    FETCH_HEAD_TIMEOUT_SECS, FETCH_MAX_RETRIES, LOGIN_FAILURE_MARKERS, USER_AGENT_POOL,
};

pub use csrf::extract_csrf_token;

/// A fetched response's essentials, decoupled from `reqwest::Response`'s
/// borrow so callers can hold it across await points freely.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// Advanced HTTP client: UA rotation, proxy support, CSRF login, retries.
pub struct FetchClient {
    client: Client,
    max_retries: u32,
    rotate_ua_per_request: bool,
}

impl FetchClient {
    /// Build a client with cookie persistence enabled. `proxy` accepts
    /// `http://`, `https://`, or `socks5://` URLs.
    pub fn new(proxy: Option<&str>, rotate_ua_per_request: bool) -> CrawlResult<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(FETCH_DEFAULT_TIMEOUT_SECS))
            .gzip(true);

        if let Some(proxy_url) = proxy {
            builder = builder.proxy(build_proxy(proxy_url)?);
        }

        let client = builder
            .build()
            .map_err(|e| CrawlError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: FETCH_MAX_RETRIES,
            rotate_ua_per_request,
        })
    }

    fn random_user_agent() -> &'static str {
        USER_AGENT_POOL
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENT_POOL[0])
    }

    fn base_headers(&self, referer: Option<&str>) -> reqwest::header::HeaderMap {
        use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        if self.rotate_ua_per_request {
            if let Ok(value) = HeaderValue::from_str(Self::random_user_agent()) {
                headers.insert(USER_AGENT, value);
            }
        }
        if let Some(referer) = referer {
            if let Ok(value) = HeaderValue::from_str(referer) {
                headers.insert(REFERER, value);
            }
        }
        headers
    }

    /// GET with retry on transient failure (429/500/502/503/504 and
    /// transport errors), backing off `0.5s * attempt` between tries.
    pub async fn get(&self, url: &str, referer: Option<&str>) -> CrawlResult<FetchedPage> {
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs_f64(FETCH_BACKOFF_FACTOR_SECS * attempt as f64)).await;
                log::info!("retrying GET {url} (attempt {})", attempt + 1);
            }

            match self.try_get(url, referer).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    log::warn!("GET {url} failed, will retry: {e}");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| CrawlError::NetworkError(format!("exhausted retries for {url}"))))
    }

    async fn try_get(&self, url: &str, referer: Option<&str>) -> CrawlResult<FetchedPage> {
        let response = self
            .client
            .get(url)
            .headers(self.base_headers(referer))
            .send()
            .await?;
        Self::into_fetched_page(response).await
    }

    /// HEAD request, used to probe size/content-type before downloading.
    pub async fn head(&self, url: &str) -> CrawlResult<Response> {
        self.client
            .head(url)
            .timeout(Duration::from_secs(FETCH_HEAD_TIMEOUT_SECS))
            .headers(self.base_headers(None))
            .send()
            .await
            .map_err(CrawlError::from)
    }

    /// GET tuned for large binary downloads: longer timeout, streamed body
    /// handled by the caller via `bytes_stream()` on the raw response.
    pub async fn get_for_download(&self, url: &str, referer: Option<&str>) -> CrawlResult<Response> {
        self.client
            .get(url)
            .timeout(Duration::from_secs(FETCH_DOWNLOAD_TIMEOUT_SECS))
            .headers(self.base_headers(referer))
            .send()
            .await
            .map_err(CrawlError::from)
    }

    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> CrawlResult<FetchedPage> {
        let response = self
            .client
            .post(url)
            .headers(self.base_headers(None))
            .form(form)
            .send()
            .await?;
        Self::into_fetched_page(response).await
    }

    /// Log in via a CSRF-protected form: fetch the login page, extract a
    /// token from the known field names, inject it into the form, and
    /// POST. Returns true if no failure marker appears in the response.
    pub async fn login(
        &self,
        login_url: &str,
        mut form_data: Vec<(String, String)>,
        csrf_page_url: Option<&str>,
    ) -> CrawlResult<bool> {
        let csrf_url = csrf_page_url.unwrap_or(login_url);
        let csrf_page = self.get(csrf_url, None).await?;
        let document = Html::parse_document(&csrf_page.body);

        if let Some((field, token)) = extract_csrf_token(&document) {
            log::debug!("extracted CSRF token via field `{field}`");
            form_data.push((field, token));
        }

        let form_refs: Vec<(&str, &str)> = form_data.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let response = self.post_form(login_url, &form_refs).await?;

        let body_lower = response.body.to_lowercase();
        let failed = LOGIN_FAILURE_MARKERS.iter().any(|marker| body_lower.contains(marker));
        if failed {
            log::warn!("login to {login_url} appears to have failed");
        } else {
            log::info!("login to {login_url} succeeded");
        }
        Ok(!failed)
    }

    async fn into_fetched_page(response: Response) -> CrawlResult<FetchedPage> {
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let response = response.error_for_status()?;
        let body = response.text().await?;

        Ok(FetchedPage {
            final_url,
            status,
            content_type,
            body,
        })
    }
}

fn build_proxy(proxy_url: &str) -> CrawlResult<Proxy> {
    Proxy::all(proxy_url).map_err(|e| CrawlError::InvalidInput(format!("invalid proxy URL {proxy_url}: {e}")))
}

fn is_retryable(err: &CrawlError) -> bool {
    match err {
        CrawlError::HttpError(status, _) => matches!(status, 429 | 500 | 502 | 503 | 504),
        CrawlError::NetworkError(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_match_policy() {
        assert!(is_retryable(&CrawlError::HttpError(503, String::new())));
        assert!(is_retryable(&CrawlError::HttpError(429, String::new())));
        assert!(!is_retryable(&CrawlError::HttpError(404, String::new())));
        assert!(is_retryable(&CrawlError::NetworkError(String::new())));
        assert!(!is_retryable(&CrawlError::ParseError(String::new())));
    }

    #[test]
    fn random_user_agent_comes_from_pool() {
        let ua = FetchClient::random_user_agent();
        assert!(USER_AGENT_POOL.contains(&ua));
    }
}
