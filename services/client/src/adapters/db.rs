//! services/client/src/adapters/db.rs
//!
//! This module contains the SQLite adapter, the durable implementation of the
//! `SnapshotStore` port from the `core` crate. Threads keep their display order
//! in a `position` column and each thread snapshot is stored as versioned JSON.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docchat_core::domain::{Source, SourceType, Thread, ThreadSnapshot};
use docchat_core::ports::{PortError, PortResult, SnapshotStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// Format version written next to every snapshot body.
pub const SNAPSHOT_VERSION: i64 = 1;

const ACTIVE_THREAD_KEY: &str = "active_thread";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A SQLite-backed store that implements the `SnapshotStore` port.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path`.
    pub async fn connect(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::with_options(options).await
    }

    /// An ephemeral database that lives as long as the store.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::with_options(options).await
    }

    async fn with_options(options: SqliteConnectOptions) -> Result<Self, sqlx::Error> {
        // A single long-lived connection: the client is single-task and an
        // in-memory database disappears with its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn storage_err(e: sqlx::Error) -> PortError {
    PortError::Storage(e.to_string())
}

fn parse_uuid(raw: &str) -> PortResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| PortError::Storage(format!("bad id '{}': {}", raw, e)))
}

fn parse_time(raw: &str) -> PortResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PortError::Storage(format!("bad timestamp '{}': {}", raw, e)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ThreadRecord {
    id: String,
    title: String,
    icon: String,
    created_at: String,
    updated_at: String,
}
impl ThreadRecord {
    fn to_domain(self) -> PortResult<Thread> {
        Ok(Thread {
            id: parse_uuid(&self.id)?,
            title: self.title,
            icon: self.icon,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct SourceRecord {
    file_id: String,
    filename: String,
    pages: i64,
    chunks: i64,
    source_type: String,
    uploaded_at: String,
    enabled: bool,
}
impl SourceRecord {
    fn to_domain(self) -> PortResult<Source> {
        let source_type = match self.source_type.as_str() {
            "pdf" => SourceType::Pdf,
            "image" => SourceType::Image,
            _ => SourceType::Unknown,
        };
        Ok(Source {
            file_id: self.file_id,
            filename: self.filename,
            pages: u32::try_from(self.pages).unwrap_or_default(),
            chunks: u32::try_from(self.chunks).unwrap_or_default(),
            source_type,
            uploaded_at: parse_time(&self.uploaded_at)?,
            enabled: self.enabled,
        })
    }
}

#[derive(FromRow)]
struct SnapshotRecord {
    version: i64,
    body: String,
}

//=========================================================================================
// `SnapshotStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SnapshotStore for SqliteStore {
    async fn load_threads(&self) -> PortResult<Vec<Thread>> {
        let records = sqlx::query_as::<_, ThreadRecord>(
            "SELECT id, title, icon, created_at, updated_at FROM threads ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        records.into_iter().map(ThreadRecord::to_domain).collect()
    }

    async fn save_threads(&self, threads: &[Thread]) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query("DELETE FROM threads")
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        for (position, thread) in threads.iter().enumerate() {
            sqlx::query(
                "INSERT INTO threads (id, position, title, icon, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(thread.id.to_string())
            .bind(position as i64)
            .bind(&thread.title)
            .bind(&thread.icon)
            .bind(thread.created_at.to_rfc3339())
            .bind(thread.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)
    }

    async fn load_active_thread(&self) -> PortResult<Option<Uuid>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM app_meta WHERE key = ?")
            .bind(ACTIVE_THREAD_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        value.as_deref().map(parse_uuid).transpose()
    }

    async fn save_active_thread(&self, thread_id: Option<Uuid>) -> PortResult<()> {
        match thread_id {
            Some(id) => sqlx::query(
                "INSERT INTO app_meta (key, value) VALUES (?, ?) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(ACTIVE_THREAD_KEY)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?,
            None => sqlx::query("DELETE FROM app_meta WHERE key = ?")
                .bind(ACTIVE_THREAD_KEY)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?,
        };
        Ok(())
    }

    async fn load_sources(&self) -> PortResult<Vec<Source>> {
        let records = sqlx::query_as::<_, SourceRecord>(
            "SELECT file_id, filename, pages, chunks, source_type, uploaded_at, enabled \
             FROM sources ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        records.into_iter().map(SourceRecord::to_domain).collect()
    }

    async fn save_sources(&self, sources: &[Source]) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query("DELETE FROM sources")
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        for (position, source) in sources.iter().enumerate() {
            sqlx::query(
                "INSERT INTO sources \
                 (file_id, position, filename, pages, chunks, source_type, uploaded_at, enabled) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&source.file_id)
            .bind(position as i64)
            .bind(&source.filename)
            .bind(i64::from(source.pages))
            .bind(i64::from(source.chunks))
            .bind(source.source_type.as_str())
            .bind(source.uploaded_at.to_rfc3339())
            .bind(source.enabled)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)
    }

    async fn load_snapshot(&self, thread_id: Uuid) -> PortResult<Option<ThreadSnapshot>> {
        let record = sqlx::query_as::<_, SnapshotRecord>(
            "SELECT version, body FROM snapshots WHERE thread_id = ?",
        )
        .bind(thread_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let Some(record) = record else {
            return Ok(None);
        };

        if record.version != SNAPSHOT_VERSION {
            warn!(
                "Dropping snapshot for thread {} with unsupported version {}",
                thread_id, record.version
            );
            return Ok(None);
        }

        match serde_json::from_str::<ThreadSnapshot>(&record.body) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Dropping unreadable snapshot for thread {}: {}", thread_id, e);
                Ok(None)
            }
        }
    }

    async fn save_snapshot(&self, thread_id: Uuid, snapshot: &ThreadSnapshot) -> PortResult<()> {
        let body = serde_json::to_string(snapshot)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO snapshots (thread_id, version, body, saved_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(thread_id) DO UPDATE SET \
             version = excluded.version, body = excluded.body, saved_at = excluded.saved_at",
        )
        .bind(thread_id.to_string())
        .bind(SNAPSHOT_VERSION)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn delete_snapshot(&self, thread_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM snapshots WHERE thread_id = ?")
            .bind(thread_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}
