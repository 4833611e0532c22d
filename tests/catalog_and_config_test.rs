//! Catalog idempotence and config validation invariants.

mod common;

use sitecrawl::catalog::{default_db_path, Catalog};
use sitecrawl::config::CrawlConfigBuilder;
use sitecrawl::error::ConfigError;
use sitecrawl::model::{Resource, ResourceType};

#[tokio::test]
async fn add_resource_twice_is_idempotent() {
    let storage = common::storage_dir();
    let catalog = Catalog::open(&default_db_path(storage.path())).await.unwrap();
    let task_id = catalog.create_task("https://example.com", storage.path()).await;

    let resource = Resource::from_url("https://example.com/a.jpg", ResourceType::Image, "");
    let first = catalog.add_resource(task_id, &resource).await;
    let second = catalog.add_resource(task_id, &resource).await;

    assert!(first > 0);
    assert_eq!(second, -1);
}

#[tokio::test]
async fn repeated_status_update_is_stable() {
    let storage = common::storage_dir();
    let catalog = Catalog::open(&default_db_path(storage.path())).await.unwrap();
    let task_id = catalog.create_task("https://example.com", storage.path()).await;

    catalog.update_task_status(task_id, "scanned", true).await;
    let first = catalog.get_task_details(task_id).await.unwrap();
    catalog.update_task_status(task_id, "scanned", true).await;
    let second = catalog.get_task_details(task_id).await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.finished_at, second.finished_at);
}

#[test]
fn zero_max_depth_is_rejected() {
    let err = CrawlConfigBuilder::new("https://example.com".to_string(), ".".to_string())
        .with_max_depth(0)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidMaxDepth));
}

#[test]
fn invalid_start_url_is_rejected() {
    let err = CrawlConfigBuilder::new("not a url".to_string(), ".".to_string()).build().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidStartUrl(_)));
}

#[test]
fn worker_count_out_of_range_is_rejected() {
    let err = CrawlConfigBuilder::new("https://example.com".to_string(), ".".to_string())
        .with_workers(9999)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidWorkerCount { .. }));
}
