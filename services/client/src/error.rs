//! services/client/src/error.rs
//!
//! Defines the error types for the client service.

use crate::config::ConfigError;
use docchat_core::ports::PortError;
use uuid::Uuid;

/// The primary error type for starting and running the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., reading stdin or a file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejections raised by the chat controller in response to a user intent.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Still waiting for the previous reply")]
    Busy,

    #[error("Thread not found: {0}")]
    ThreadNotFound(Uuid),

    #[error("Source not found: {0}")]
    SourceNotFound(String),
}
