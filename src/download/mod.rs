//! Concurrent download of a filtered selection of aggregated resources:
//! retries, atomic writes, cached-skip, and Catalog bookkeeping.

mod filename;

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use base64::Engine;
use futures::stream::{FuturesUnordered, StreamExt};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

use crate::catalog::Catalog;
use crate::events::{CrawlEvent, EventBus};
use crate::fetch::FetchClient;
use crate::model::{Resource, ResourceStatus};
use crate::utils::constants::{
    CACHE_SIZE_TOLERANCE_BYTES, DISK_SPACE_MIN_BYTES, DISK_SPACE_RESERVE_BYTES, DOWNLOAD_MAX_RETRIES,
    DOWNLOAD_RETRY_BASE_SECS,
};

pub use filename::{derive_filename, ensure_unique};

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub url: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Downloads a flat list of resources concurrently under a bounded
/// worker pool, reporting progress and persisting outcomes to the
/// catalog.
pub struct DownloadPool {
    client: Arc<FetchClient>,
    catalog: Arc<Catalog>,
    events: EventBus,
    workers: usize,
}

impl DownloadPool {
    #[must_use]
    pub fn new(client: Arc<FetchClient>, catalog: Arc<Catalog>, events: EventBus, workers: usize) -> Self {
        Self {
            client,
            catalog,
            events,
            workers: workers.max(1),
        }
    }

    /// Download every resource in `resources` into `output_dir`, under
    /// catalog `task_id`. `stop` is polled between items for cooperative
    /// cancellation; in-flight transfers are not aborted.
    pub async fn run(&self, task_id: i64, resources: Vec<Resource>, output_dir: &Path, stop: Arc<AtomicBool>) -> (usize, usize) {
        let total = resources.len();
        if total == 0 {
            return (0, 0);
        }

        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            log::error!("failed to create output directory {}: {e}", output_dir.display());
            return (0, total);
        }

        for resource in &resources {
            self.catalog.add_resource(task_id, resource).await;
        }

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let completed = Arc::new(AtomicUsize::new(0));
        let success = Arc::new(AtomicUsize::new(0));

        let mut in_flight = FuturesUnordered::new();

        for resource in resources {
            if stop.load(Ordering::Relaxed) {
                break;
            }

            let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
            let client = self.client.clone();
            let catalog = self.catalog.clone();
            let output_dir = output_dir.to_path_buf();
            let completed = completed.clone();
            let success = success.clone();
            let events = self.events.clone();
            let stop = stop.clone();

            in_flight.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = download_one(&client, &catalog, task_id, &resource, &output_dir, &stop).await;

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if outcome.success {
                    success.fetch_add(1, Ordering::SeqCst);
                    events.log(format!("downloaded {}", outcome.url));
                } else {
                    events.log(format!("failed {} ({})", outcome.url, outcome.error.clone().unwrap_or_default()));
                }
                events.publish(CrawlEvent::Progress { done, total });
                outcome
            }));
        }

        while in_flight.next().await.is_some() {}

        let success_count = success.load(Ordering::SeqCst);
        self.catalog.update_task_progress(task_id, success_count as i64, total as i64).await;
        events_finish(&self.events, success_count, total);
        (success_count, total)
    }
}

fn events_finish(events: &EventBus, success: usize, total: usize) {
    events.publish(CrawlEvent::DownloadFinished { success, total });
}

async fn download_one(
    client: &FetchClient,
    catalog: &Catalog,
    task_id: i64,
    resource: &Resource,
    output_dir: &Path,
    stop: &Arc<AtomicBool>,
) -> DownloadOutcome {
    let filename = derive_filename(resource);
    let derived_target = output_dir.join(&filename);
    let preexisted = derived_target.exists();
    let target = ensure_unique(output_dir, &filename);

    if !resource.content.is_empty() {
        return write_inline_content(catalog, task_id, resource, &target).await;
    }

    if preexisted {
        if let Some(outcome) = try_cache_skip(client, catalog, task_id, resource, &derived_target).await {
            return outcome;
        }
    }

    if let Some(data_uri) = resource.url.strip_prefix("data:") {
        return write_data_uri(catalog, task_id, resource, &target, data_uri).await;
    }

    download_with_retries(client, catalog, task_id, resource, &target, stop).await
}

async fn write_inline_content(catalog: &Catalog, task_id: i64, resource: &Resource, target: &Path) -> DownloadOutcome {
    match tokio::fs::write(target, resource.content.as_bytes()).await {
        Ok(()) => {
            let size = resource.content.len() as u64;
            catalog
                .update_resource_status(task_id, &resource.url, ResourceStatus::Completed, target.to_str(), Some(size), None)
                .await;
            DownloadOutcome { url: resource.url.clone(), success: true, error: None }
        }
        Err(e) => {
            let error = e.to_string();
            catalog
                .update_resource_status(task_id, &resource.url, ResourceStatus::Failed, None, None, Some(&error))
                .await;
            DownloadOutcome { url: resource.url.clone(), success: false, error: Some(error) }
        }
    }
}

async fn try_cache_skip(
    client: &FetchClient,
    catalog: &Catalog,
    task_id: i64,
    resource: &Resource,
    target: &Path,
) -> Option<DownloadOutcome> {
    let local_size = tokio::fs::metadata(target).await.ok()?.len();
    if local_size == 0 {
        return None;
    }

    let response = client.head(&resource.url).await.ok()?;
    let remote_size: u64 = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())?;

    let diff = (remote_size as i64 - local_size as i64).abs();
    if remote_size > 0 && diff < CACHE_SIZE_TOLERANCE_BYTES {
        catalog
            .update_resource_status(
                task_id,
                &resource.url,
                ResourceStatus::Completed,
                target.to_str(),
                Some(local_size),
                Some("Skipped (cached)"),
            )
            .await;
        return Some(DownloadOutcome { url: resource.url.clone(), success: true, error: None });
    }
    None
}

async fn write_data_uri(catalog: &Catalog, task_id: i64, resource: &Resource, target: &Path, data_uri: &str) -> DownloadOutcome {
    let Some((_, encoded)) = data_uri.split_once(',') else {
        let error = "malformed data URI".to_string();
        catalog
            .update_resource_status(task_id, &resource.url, ResourceStatus::Failed, None, None, Some(&error))
            .await;
        return DownloadOutcome { url: resource.url.clone(), success: false, error: Some(error) };
    };

    let decoded = match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            let error = format!("failed to decode data URI: {e}");
            catalog
                .update_resource_status(task_id, &resource.url, ResourceStatus::Failed, None, None, Some(&error))
                .await;
            return DownloadOutcome { url: resource.url.clone(), success: false, error: Some(error) };
        }
    };

    match tokio::fs::write(target, &decoded).await {
        Ok(()) => {
            catalog
                .update_resource_status(
                    task_id,
                    &resource.url,
                    ResourceStatus::Completed,
                    target.to_str(),
                    Some(decoded.len() as u64),
                    None,
                )
                .await;
            DownloadOutcome { url: resource.url.clone(), success: true, error: None }
        }
        Err(e) => {
            let error = e.to_string();
            catalog
                .update_resource_status(task_id, &resource.url, ResourceStatus::Failed, None, None, Some(&error))
                .await;
            DownloadOutcome { url: resource.url.clone(), success: false, error: Some(error) }
        }
    }
}

fn has_disk_space(output_dir: &Path, required: u64) -> bool {
    crate::utils::disk_space::available_bytes(output_dir)
        .map(|free| free > required + DISK_SPACE_RESERVE_BYTES)
        .unwrap_or(true)
}

async fn download_with_retries(
    client: &FetchClient,
    catalog: &Catalog,
    task_id: i64,
    resource: &Resource,
    target: &Path,
    stop: &Arc<AtomicBool>,
) -> DownloadOutcome {
    let mut last_error = String::new();

    for attempt in 0..=DOWNLOAD_MAX_RETRIES {
        if stop.load(Ordering::Relaxed) {
            last_error = "cancelled".to_string();
            break;
        }
        if attempt > 0 {
            let delay = DOWNLOAD_RETRY_BASE_SECS * (attempt as u64 + 1);
            tokio::time::sleep(std::time::Duration::from_secs(delay)).await;
        }

        match stream_download(client, resource, target).await {
            Ok(()) => {
                let size = tokio::fs::metadata(target).await.map(|m| m.len()).unwrap_or(0);
                catalog
                    .update_resource_status(task_id, &resource.url, ResourceStatus::Completed, target.to_str(), Some(size), None)
                    .await;
                return DownloadOutcome { url: resource.url.clone(), success: true, error: None };
            }
            Err(e) => {
                log::warn!("download attempt {}/{} failed for {}: {e}", attempt + 1, DOWNLOAD_MAX_RETRIES + 1, resource.url);
                last_error = e;
            }
        }
    }

    catalog
        .update_resource_status(task_id, &resource.url, ResourceStatus::Failed, None, None, Some(&last_error))
        .await;
    DownloadOutcome { url: resource.url.clone(), success: false, error: Some(last_error) }
}

async fn stream_download(client: &FetchClient, resource: &Resource, target: &Path) -> Result<(), String> {
    if !has_disk_space(target.parent().unwrap_or(Path::new(".")), DISK_SPACE_MIN_BYTES) {
        return Err("insufficient disk space".to_string());
    }

    let response = client
        .get_for_download(&resource.url, Some(&resource.referer))
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    if let Some(len) = response.content_length() {
        if !has_disk_space(target.parent().unwrap_or(Path::new(".")), len) {
            return Err(format!("insufficient disk space for {len} bytes"));
        }
    }

    let parent = target.parent().unwrap_or(Path::new("."));
    let temp_file = NamedTempFile::new_in(parent).map_err(|e| e.to_string())?;
    let (file, temp_path) = temp_file.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        file.write_all(&chunk).await.map_err(|e| e.to_string())?;
    }
    file.flush().await.map_err(|e| e.to_string())?;
    drop(file);

    if target.exists() {
        let _ = tokio::fs::remove_file(target).await;
    }
    temp_path.persist(target).map_err(|e| e.error.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;

    #[tokio::test]
    async fn inline_content_writes_file_and_reports_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("catalog.sqlite");
        let catalog = Arc::new(Catalog::open(&db_path).await.unwrap());
        let task_id = catalog.create_task("https://example.com", dir.path()).await;

        let mut resource = Resource::from_url("https://example.com/notes.txt", ResourceType::Text, "");
        resource.content = "hello world".to_string();

        let target = dir.path().join("notes.txt");
        let outcome = write_inline_content(&catalog, task_id, &resource, &target).await;
        assert!(outcome.success);
        assert_eq!(tokio::fs::read_to_string(&target).await.unwrap(), "hello world");
    }
}
