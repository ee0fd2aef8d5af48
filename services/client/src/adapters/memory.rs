//! services/client/src/adapters/memory.rs
//!
//! An in-process `SnapshotStore`, used when no database is wanted and by tests.
//! Snapshots are kept as JSON so a load returns a fresh copy, like the SQLite store.

use async_trait::async_trait;
use docchat_core::domain::{Source, Thread, ThreadSnapshot};
use docchat_core::ports::{PortError, PortResult, SnapshotStore};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    threads: Vec<Thread>,
    active: Option<Uuid>,
    sources: Vec<Source>,
    snapshots: HashMap<Uuid, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads that currently have a stored snapshot.
    pub async fn snapshot_count(&self) -> usize {
        self.inner.lock().await.snapshots.len()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load_threads(&self) -> PortResult<Vec<Thread>> {
        Ok(self.inner.lock().await.threads.clone())
    }

    async fn save_threads(&self, threads: &[Thread]) -> PortResult<()> {
        self.inner.lock().await.threads = threads.to_vec();
        Ok(())
    }

    async fn load_active_thread(&self) -> PortResult<Option<Uuid>> {
        Ok(self.inner.lock().await.active)
    }

    async fn save_active_thread(&self, thread_id: Option<Uuid>) -> PortResult<()> {
        self.inner.lock().await.active = thread_id;
        Ok(())
    }

    async fn load_sources(&self) -> PortResult<Vec<Source>> {
        Ok(self.inner.lock().await.sources.clone())
    }

    async fn save_sources(&self, sources: &[Source]) -> PortResult<()> {
        self.inner.lock().await.sources = sources.to_vec();
        Ok(())
    }

    async fn load_snapshot(&self, thread_id: Uuid) -> PortResult<Option<ThreadSnapshot>> {
        let inner = self.inner.lock().await;
        inner
            .snapshots
            .get(&thread_id)
            .map(|body| serde_json::from_str(body).map_err(|e| PortError::Storage(e.to_string())))
            .transpose()
    }

    async fn save_snapshot(&self, thread_id: Uuid, snapshot: &ThreadSnapshot) -> PortResult<()> {
        let body =
            serde_json::to_string(snapshot).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.inner.lock().await.snapshots.insert(thread_id, body);
        Ok(())
    }

    async fn delete_snapshot(&self, thread_id: Uuid) -> PortResult<()> {
        self.inner.lock().await.snapshots.remove(&thread_id);
        Ok(())
    }
}
