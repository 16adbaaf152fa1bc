//! Metadata store trait and implementations.

use crate::error::MetadataResult;
use crate::repos::{FileInfoRepo, LocationRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: LocationRepo + FileInfoRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) a SQLite store and apply the schema.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // Writers serialize on one connection; avoids "database is locked" under load.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "opened sqlite metadata store");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::*;

    #[async_trait]
    impl LocationRepo for SqliteStore {
        async fn insert_location_if_absent(&self, location: &LocationRow) -> MetadataResult<bool> {
            let result = sqlx::query(
                r#"
                INSERT INTO file_locations (file_name, directory, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(file_name) DO NOTHING
                "#,
            )
            .bind(&location.file_name)
            .bind(&location.directory)
            .bind(location.created_at)
            .bind(location.updated_at)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() == 1)
        }

        async fn get_location(&self, file_name: &str) -> MetadataResult<Option<LocationRow>> {
            let row = sqlx::query_as::<_, LocationRow>(
                "SELECT file_name, directory, created_at, updated_at FROM file_locations WHERE file_name = ?",
            )
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }
    }

    #[async_trait]
    impl FileInfoRepo for SqliteStore {
        async fn get_file_info(&self, path: &str) -> MetadataResult<Option<FileInfoRow>> {
            let row = sqlx::query_as::<_, FileInfoRow>(
                r#"
                SELECT path, content_hash, size_bytes, last_modified_ms, cached_at
                FROM file_info WHERE path = ?
                "#,
            )
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn upsert_file_info(&self, info: &FileInfoRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO file_info (path, content_hash, size_bytes, last_modified_ms, cached_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(path) DO UPDATE SET
                    content_hash = excluded.content_hash,
                    size_bytes = excluded.size_bytes,
                    last_modified_ms = excluded.last_modified_ms,
                    cached_at = excluded.cached_at
                "#,
            )
            .bind(&info.path)
            .bind(&info.content_hash)
            .bind(info.size_bytes)
            .bind(info.last_modified_ms)
            .bind(info.cached_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- Location index: one directory per logical file name, never reassigned
CREATE TABLE IF NOT EXISTS file_locations (
    file_name TEXT PRIMARY KEY NOT NULL,
    directory TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Content metadata cache keyed by resolved path
CREATE TABLE IF NOT EXISTS file_info (
    path TEXT PRIMARY KEY NOT NULL,
    content_hash TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    last_modified_ms INTEGER NOT NULL,
    cached_at TEXT NOT NULL
);
"#;
