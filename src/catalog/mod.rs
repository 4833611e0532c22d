//! Durable store of crawl Tasks and their Resources: SQLite with WAL
//! journaling and an integrity check on open. Every operation opens,
//! uses, and drops its own connection from the pool; failures are
//! logged and swallowed so storage issues never crash the pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error::CatalogError;
use crate::model::{Resource, ResourceStatus};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    finished_at TIMESTAMP,
    total_items INTEGER NOT NULL DEFAULT 0,
    downloaded_items INTEGER NOT NULL DEFAULT 0,
    save_path TEXT
);

CREATE TABLE IF NOT EXISTS resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL REFERENCES tasks(id),
    url TEXT NOT NULL,
    resource_type TEXT NOT NULL,
    filename TEXT,
    local_path TEXT,
    file_size INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'pending',
    error_msg TEXT,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_resources_task ON resources(task_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_resources_task_url ON resources(task_id, url);
"#;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRecord {
    pub id: i64,
    pub source_url: String,
    pub status: String,
    pub created_at: chrono::NaiveDateTime,
    pub finished_at: Option<chrono::NaiveDateTime>,
    pub total_items: i64,
    pub downloaded_items: i64,
    pub save_path: Option<String>,
}

/// Handle to the crawl catalog database.
#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Open (creating if absent) the catalog at `db_path`, enabling WAL
    /// and running an integrity check.
    pub async fn open(db_path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = db_path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|source| CatalogError::Open {
                path: db_path.display().to_string(),
                source,
            })?;

        let integrity: (String,) = sqlx::query_as("PRAGMA integrity_check")
            .fetch_one(&pool)
            .await
            .map_err(CatalogError::Migration)?;
        if integrity.0 != "ok" {
            return Err(CatalogError::IntegrityCheck(integrity.0));
        }

        sqlx::query(SCHEMA_SQL).execute(&pool).await.map_err(CatalogError::Migration)?;

        Ok(Self { pool })
    }

    /// Create a new task, returning its id, or `-1` on failure.
    pub async fn create_task(&self, source_url: &str, save_path: &Path) -> i64 {
        let result = sqlx::query(
            "INSERT INTO tasks (source_url, status, save_path, created_at) VALUES (?, 'running', ?, ?)",
        )
        .bind(source_url)
        .bind(save_path.display().to_string())
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await;

        match result {
            Ok(r) => r.last_insert_rowid(),
            Err(e) => {
                log::error!("failed to create task for {source_url}: {e}");
                -1
            }
        }
    }

    pub async fn update_task_status(&self, task_id: i64, status: &str, finished: bool) {
        let result = if finished {
            sqlx::query("UPDATE tasks SET status = ?, finished_at = ? WHERE id = ?")
                .bind(status)
                .bind(Utc::now().naive_utc())
                .bind(task_id)
                .execute(&self.pool)
                .await
        } else {
            sqlx::query("UPDATE tasks SET status = ? WHERE id = ?")
                .bind(status)
                .bind(task_id)
                .execute(&self.pool)
                .await
        };
        if let Err(e) = result {
            log::error!("failed to update status for task {task_id}: {e}");
        }
    }

    pub async fn update_task_progress(&self, task_id: i64, downloaded: i64, total: i64) {
        let result = sqlx::query("UPDATE tasks SET downloaded_items = ?, total_items = ? WHERE id = ?")
            .bind(downloaded)
            .bind(total)
            .bind(task_id)
            .execute(&self.pool)
            .await;
        if let Err(e) = result {
            log::error!("failed to update progress for task {task_id}: {e}");
        }
    }

    pub async fn delete_task(&self, task_id: i64) {
        if let Err(e) = sqlx::query("DELETE FROM resources WHERE task_id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await
        {
            log::error!("failed to delete resources for task {task_id}: {e}");
        }
        if let Err(e) = sqlx::query("DELETE FROM tasks WHERE id = ?").bind(task_id).execute(&self.pool).await {
            log::error!("failed to delete task {task_id}: {e}");
        }
    }

    pub async fn clear_all_tasks(&self) {
        let _ = sqlx::query("DELETE FROM resources").execute(&self.pool).await;
        let _ = sqlx::query("DELETE FROM tasks").execute(&self.pool).await;
        let _ = sqlx::query("DELETE FROM sqlite_sequence WHERE name IN ('tasks', 'resources')")
            .execute(&self.pool)
            .await;
    }

    /// Idempotently add a resource; returns `-1` if `(task_id, url)` is
    /// already present (not an error) or on failure.
    pub async fn add_resource(&self, task_id: i64, resource: &Resource) -> i64 {
        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM resources WHERE task_id = ? AND url = ?")
            .bind(task_id)
            .bind(&resource.url)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or(None);
        if existing.is_some() {
            return -1;
        }

        let result = sqlx::query(
            "INSERT INTO resources (task_id, url, resource_type, filename, status) VALUES (?, ?, ?, ?, 'pending')",
        )
        .bind(task_id)
        .bind(&resource.url)
        .bind(resource.resource_type.to_string())
        .bind(&resource.title)
        .execute(&self.pool)
        .await;

        match result {
            Ok(r) => r.last_insert_rowid(),
            Err(e) => {
                log::error!("failed to add resource {}: {e}", resource.url);
                -1
            }
        }
    }

    /// Dynamic partial-field update, matching only the fields given.
    pub async fn update_resource_status(
        &self,
        task_id: i64,
        url: &str,
        status: ResourceStatus,
        local_path: Option<&str>,
        file_size: Option<u64>,
        error: Option<&str>,
    ) {
        let mut query = String::from("UPDATE resources SET status = ?, updated_at = ?");
        if local_path.is_some() {
            query.push_str(", local_path = ?");
        }
        if file_size.is_some() {
            query.push_str(", file_size = ?");
        }
        if error.is_some() {
            query.push_str(", error_msg = ?");
        }
        query.push_str(" WHERE task_id = ? AND url = ?");

        let mut q = sqlx::query(&query).bind(status.to_string()).bind(Utc::now().naive_utc());
        if let Some(path) = local_path {
            q = q.bind(path);
        }
        if let Some(size) = file_size {
            q = q.bind(size as i64);
        }
        if let Some(err) = error {
            q = q.bind(err);
        }
        q = q.bind(task_id).bind(url);

        if let Err(e) = q.execute(&self.pool).await {
            log::error!("failed to update resource {url} for task {task_id}: {e}");
        }
    }

    pub async fn get_all_tasks(&self) -> Vec<TaskRecord> {
        sqlx::query_as("SELECT * FROM tasks ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                log::error!("failed to fetch tasks: {e}");
                Vec::new()
            })
    }

    pub async fn get_task_details(&self, task_id: i64) -> Option<TaskRecord> {
        sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                log::error!("failed to fetch task {task_id}: {e}");
                None
            })
    }

    pub async fn resource_count_for_task(&self, task_id: i64) -> i64 {
        let row = sqlx::query("SELECT COUNT(*) as c FROM resources WHERE task_id = ?")
            .bind(task_id)
            .fetch_one(&self.pool)
            .await;
        match row {
            Ok(r) => r.get("c"),
            Err(e) => {
                log::error!("failed to count resources for task {task_id}: {e}");
                0
            }
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[must_use]
pub fn default_db_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(".sitecrawl").join("catalog.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;
    use tempfile::TempDir;

    async fn open_test_catalog() -> (TempDir, Catalog) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("catalog.sqlite");
        let catalog = Catalog::open(&db_path).await.unwrap();
        (dir, catalog)
    }

    #[tokio::test]
    async fn create_task_returns_positive_id() {
        let (_dir, catalog) = open_test_catalog().await;
        let id = catalog.create_task("https://example.com", Path::new("/tmp/out")).await;
        assert!(id > 0);
    }

    #[tokio::test]
    async fn add_resource_is_idempotent() {
        let (_dir, catalog) = open_test_catalog().await;
        let task_id = catalog.create_task("https://example.com", Path::new("/tmp/out")).await;
        let resource = Resource::from_url("https://example.com/a.jpg", ResourceType::Image, "");

        let first = catalog.add_resource(task_id, &resource).await;
        let second = catalog.add_resource(task_id, &resource).await;
        assert!(first > 0);
        assert_eq!(second, -1);
        assert_eq!(catalog.resource_count_for_task(task_id).await, 1);
    }

    #[tokio::test]
    async fn update_resource_status_sets_only_given_fields() {
        let (_dir, catalog) = open_test_catalog().await;
        let task_id = catalog.create_task("https://example.com", Path::new("/tmp/out")).await;
        let resource = Resource::from_url("https://example.com/a.jpg", ResourceType::Image, "");
        catalog.add_resource(task_id, &resource).await;

        catalog
            .update_resource_status(task_id, &resource.url, ResourceStatus::Completed, Some("/tmp/out/a.jpg"), Some(1234), None)
            .await;

        let row: (String, String, i64) =
            sqlx::query_as("SELECT status, local_path, file_size FROM resources WHERE task_id = ? AND url = ?")
                .bind(task_id)
                .bind(&resource.url)
                .fetch_one(&catalog.pool)
                .await
                .unwrap();
        assert_eq!(row.0, "completed");
        assert_eq!(row.1, "/tmp/out/a.jpg");
        assert_eq!(row.2, 1234);
    }

    #[tokio::test]
    async fn delete_task_cascades_resources() {
        let (_dir, catalog) = open_test_catalog().await;
        let task_id = catalog.create_task("https://example.com", Path::new("/tmp/out")).await;
        let resource = Resource::from_url("https://example.com/a.jpg", ResourceType::Image, "");
        catalog.add_resource(task_id, &resource).await;

        catalog.delete_task(task_id).await;
        assert_eq!(catalog.resource_count_for_task(task_id).await, 0);
        assert!(catalog.get_task_details(task_id).await.is_none());
    }
}
