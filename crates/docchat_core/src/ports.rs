//! crates/docchat_core/src/ports.rs
//!
//! Defines the service contracts (traits) the chat client depends on.
//! The controllers only see these traits, so the document backend and the
//! local storage can be swapped for HTTP, SQLite or in-memory implementations.

use crate::domain::{
    HealthStatus, QueryRequest, QueryResponse, Source, Thread, ThreadSnapshot, UploadResult,
};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The request never reached the server (connection refused, DNS, timeout).
    #[error("Network unreachable: {0}")]
    Unreachable(String),
    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable local state: the thread list, the active-thread pointer, and one
/// snapshot per thread id. Implementations own the serialized format.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns threads in display order (most recently created first).
    async fn load_threads(&self) -> PortResult<Vec<Thread>>;

    async fn save_threads(&self, threads: &[Thread]) -> PortResult<()>;

    async fn load_active_thread(&self) -> PortResult<Option<Uuid>>;

    async fn save_active_thread(&self, thread_id: Option<Uuid>) -> PortResult<()>;

    /// The document list shared by every thread, in display order.
    async fn load_sources(&self) -> PortResult<Vec<Source>>;

    /// Replaces the stored document list.
    async fn save_sources(&self, sources: &[Source]) -> PortResult<()>;

    /// `Ok(None)` when nothing is stored for the thread or the stored format is unreadable.
    async fn load_snapshot(&self, thread_id: Uuid) -> PortResult<Option<ThreadSnapshot>>;

    async fn save_snapshot(&self, thread_id: Uuid, snapshot: &ThreadSnapshot) -> PortResult<()>;

    async fn delete_snapshot(&self, thread_id: Uuid) -> PortResult<()>;
}

/// The external document/chat backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Uploads a file for ingestion and indexing.
    async fn upload_document(&self, filename: &str, data: &[u8]) -> PortResult<UploadResult>;

    /// Asks a question, optionally grounded in an uploaded document.
    async fn query(&self, request: &QueryRequest) -> PortResult<QueryResponse>;

    async fn health(&self) -> PortResult<HealthStatus>;
}
