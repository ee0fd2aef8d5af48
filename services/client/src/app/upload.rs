//! services/client/src/app/upload.rs
//!
//! Drag/drop state, the cosmetic progress animation, and the upload request
//! lifecycle. The progress value is display-only: it creeps toward 90 while
//! the request is in flight and snaps to 100 when the server answers.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use docchat_core::domain::{SourceType, UploadResult};
use docchat_core::ports::{ChatBackend, PortError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const PROGRESS_CAP: u8 = 90;
const PROGRESS_STEP: u8 = 10;

/// Error text fragments that mean the request never reached the server.
const NETWORK_HINTS: [&str; 4] = [
    "failed to fetch",
    "connection refused",
    "error sending request",
    "network unreachable",
];

/// A file picked or dropped by the user.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub data: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown.pdf".to_string());
        Ok(Self::new(name, data))
    }

    pub fn source_type(&self) -> SourceType {
        SourceType::from_filename(&self.name)
    }

    pub fn mime_type(&self) -> &'static str {
        let lower = self.name.to_ascii_lowercase();
        match lower.rsplit_once('.').map(|(_, ext)| ext) {
            Some("pdf") => "application/pdf",
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("bmp") => "image/bmp",
            Some("tiff") => "image/tiff",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        }
    }

    /// A preview URL built from the raw bytes; nothing is fetched from the server.
    pub fn preview_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Dragging,
    Uploading,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Unsupported file type: {0}. Upload a PDF or an image.")]
    Unsupported(String),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct UploadSuccess {
    pub result: UploadResult,
    pub preview_url: String,
}

pub fn next_progress(current: u8) -> u8 {
    if current >= PROGRESS_CAP {
        current
    } else {
        current.saturating_add(PROGRESS_STEP).min(PROGRESS_CAP)
    }
}

/// Turns a failed upload into a message for the user, telling an unreachable
/// backend apart from one that rejected the file.
pub fn describe_upload_error(err: &PortError) -> String {
    let text = err.to_string().to_lowercase();
    if matches!(err, PortError::Unreachable(_)) || NETWORK_HINTS.iter().any(|h| text.contains(h)) {
        "Cannot reach the server. Make sure the backend is running.".to_string()
    } else {
        format!("Upload failed: {}", err)
    }
}

pub struct UploadController {
    state: UploadState,
    progress: Arc<watch::Sender<u8>>,
    tick: Duration,
}

impl UploadController {
    pub fn new(tick: Duration) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            state: UploadState::Idle,
            progress: Arc::new(progress),
            tick,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    /// A receiver that observes the progress animation while an upload runs.
    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn drag_enter(&mut self) {
        if self.state == UploadState::Idle {
            self.state = UploadState::Dragging;
        }
    }

    /// Leaving the drop zone and dropping both end the drag.
    pub fn drag_leave(&mut self) {
        if self.state == UploadState::Dragging {
            self.state = UploadState::Idle;
        }
    }

    pub async fn upload(
        &mut self,
        backend: &dyn ChatBackend,
        file: &LocalFile,
    ) -> Result<UploadSuccess, UploadError> {
        self.drag_leave();
        if file.source_type() == SourceType::Unknown {
            return Err(UploadError::Unsupported(file.name.clone()));
        }

        info!("Uploading '{}' ({} bytes)", file.name, file.data.len());
        self.state = UploadState::Uploading;
        self.progress.send_replace(0);

        let cancel = CancellationToken::new();
        let ticker = spawn_progress_ticker(self.progress.clone(), self.tick, cancel.clone());

        let outcome = backend.upload_document(&file.name, &file.data).await;

        cancel.cancel();
        report_ticker_exit(ticker.await);
        self.state = UploadState::Idle;

        match outcome {
            Ok(result) => {
                self.progress.send_replace(100);
                info!(
                    "Upload of '{}' indexed as {} ({} pages, {} chunks)",
                    result.filename, result.file_id, result.pages, result.chunks_indexed
                );
                Ok(UploadSuccess {
                    preview_url: file.preview_url(),
                    result,
                })
            }
            Err(e) => {
                self.progress.send_replace(0);
                warn!("Upload of '{}' failed: {}", file.name, e);
                Err(UploadError::Failed(describe_upload_error(&e)))
            }
        }
    }
}

/// Logs a progress ticker that crashed. Returns whether it did.
fn report_ticker_exit(result: Result<(), JoinError>) -> bool {
    match result {
        Err(e) if e.is_panic() => {
            warn!("Upload progress ticker panicked: {}", e);
            true
        }
        _ => false,
    }
}

fn spawn_progress_ticker(
    progress: Arc<watch::Sender<u8>>,
    tick: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    // `interval` panics on a zero period.
    let tick = tick.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    progress.send_modify(|p| *p = next_progress(*p));
                }
            }
        }
    })
}
