//! services/client/src/app/state.rs
//!
//! Defines `ChatApp`, the page-level controller. It owns the thread and source
//! registries, the visible transcript, the upload controller and the notice
//! center, and it is the only place that talks to the store and the backend.

use crate::app::notices::{Notice, NoticeCenter, NoticeId};
use crate::app::sources::{select_all_forces_retrieval, SourceRegistry};
use crate::app::threads::{seed_messages, title_from_filename, ThreadRegistry, DEFAULT_TITLE};
use crate::app::upload::{LocalFile, UploadController, UploadState, UploadSuccess};
use crate::app::export;
use crate::config::Config;
use crate::error::AppError;
use chrono::Utc;
use docchat_core::domain::{Message, Source, Thread, ThreadSnapshot};
use docchat_core::ports::{ChatBackend, PortError, PortResult, SnapshotStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

//=========================================================================================
// Settings
//=========================================================================================

/// Timings and limits the controller needs, split out of `Config` so tests can
/// build a controller without touching the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub progress_tick: Duration,
    pub typing_delay: Duration,
    pub notice_ttl: Duration,
    pub history_window: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(200),
            typing_delay: Duration::from_millis(600),
            notice_ttl: Duration::from_millis(4000),
            history_window: 10,
        }
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            progress_tick: config.progress_tick,
            typing_delay: config.typing_delay,
            notice_ttl: config.notice_ttl,
            history_window: config.history_window,
        }
    }
}

//=========================================================================================
// Page State
//=========================================================================================

/// The document that retrieval queries are addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub file_id: String,
    pub filename: String,
}

impl From<&Source> for UploadTarget {
    fn from(source: &Source) -> Self {
        Self {
            file_id: source.file_id.clone(),
            filename: source.filename.clone(),
        }
    }
}

/// Page-level mode: `NoDocument` until an upload succeeds, then retrieval can
/// be switched on and off until the target document is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    NoDocument,
    DocumentUploaded { retrieval: bool },
}

pub struct ChatApp {
    pub(crate) settings: Settings,
    pub(crate) backend: Arc<dyn ChatBackend>,
    pub(crate) store: Arc<dyn SnapshotStore>,
    pub(crate) threads: ThreadRegistry,
    pub(crate) sources: SourceRegistry,
    pub(crate) messages: Vec<Message>,
    pub(crate) upload: UploadController,
    pub(crate) notices: NoticeCenter,
    pub(crate) use_rag: bool,
    pub(crate) target: Option<UploadTarget>,
    /// Thread whose query is in flight, if any.
    pub(crate) awaiting_reply: Option<Uuid>,
    pub(crate) recommended: Vec<String>,
    pub(crate) previews: HashMap<String, String>,
    pub(crate) open_preview: Option<String>,
}

impl ChatApp {
    /// A controller with no threads and no documents.
    pub fn new(
        settings: Settings,
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            upload: UploadController::new(settings.progress_tick),
            notices: NoticeCenter::new(settings.notice_ttl),
            settings,
            backend,
            store,
            threads: ThreadRegistry::default(),
            sources: SourceRegistry::default(),
            messages: seed_messages(),
            use_rag: false,
            target: None,
            awaiting_reply: None,
            recommended: Vec::new(),
            previews: HashMap::new(),
            open_preview: None,
        }
    }

    /// Rebuilds the controller from the store: thread list, active thread,
    /// the shared document list and the active thread's snapshot, whose
    /// enable flags are applied on top. The newest source becomes the target.
    pub async fn restore(
        settings: Settings,
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn SnapshotStore>,
    ) -> PortResult<Self> {
        let threads = store.load_threads().await?;
        let active = store.load_active_thread().await?;
        let sources = store.load_sources().await?;
        let registry = ThreadRegistry::restore(threads, active);

        let snapshot = match registry.active_id() {
            Some(id) => store.load_snapshot(id).await?,
            None => None,
        };

        let mut app = Self::new(settings, backend, store);
        app.sources = SourceRegistry::new(sources);
        if let Some(snapshot) = snapshot {
            if app.sources.is_empty() && !snapshot.sources.is_empty() {
                // Written before the shared list was stored on its own.
                app.sources = SourceRegistry::new(snapshot.sources);
            } else {
                app.sources.apply_flags(&snapshot.sources);
            }
            app.messages = snapshot.messages;
        }
        app.target = app.sources.latest().map(UploadTarget::from);
        app.use_rag = app.target.is_some() && app.sources.any_enabled();
        app.threads = registry;

        info!(
            "Restored {} thread(s), {} source(s)",
            app.threads.threads().len(),
            app.sources.len()
        );
        Ok(app)
    }

    //=====================================================================================
    // Read access for the view layer
    //=====================================================================================

    pub fn threads(&self) -> &[Thread] {
        self.threads.threads()
    }

    pub fn active_thread(&self) -> Option<&Thread> {
        self.threads.active()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn sources(&self) -> &[Source] {
        self.sources.sources()
    }

    pub fn use_rag(&self) -> bool {
        self.use_rag
    }

    pub fn target(&self) -> Option<&UploadTarget> {
        self.target.as_ref()
    }

    /// True while the visible thread waits for a reply.
    pub fn is_typing(&self) -> bool {
        self.awaiting_reply.is_some() && self.awaiting_reply == self.threads.active_id()
    }

    pub fn upload_state(&self) -> UploadState {
        self.upload.state()
    }

    pub fn upload_progress(&self) -> u8 {
        self.upload.progress()
    }

    /// Progress updates of the running upload, for a renderer that redraws
    /// while `upload_file` is still awaiting the backend.
    pub fn upload_progress_feed(&self) -> tokio::sync::watch::Receiver<u8> {
        self.upload.subscribe()
    }

    pub fn recommended_actions(&self) -> &[String] {
        &self.recommended
    }

    pub fn notices(&self) -> &[Notice] {
        self.notices.active()
    }

    pub fn page_mode(&self) -> PageMode {
        match self.target {
            None => PageMode::NoDocument,
            Some(_) => PageMode::DocumentUploaded {
                retrieval: self.use_rag,
            },
        }
    }

    /// The open preview overlay as `(source, preview url)`.
    pub fn preview(&self) -> Option<(&Source, &str)> {
        let file_id = self.open_preview.as_deref()?;
        let source = self.sources.get(file_id)?;
        let url = self.previews.get(file_id)?;
        Some((source, url.as_str()))
    }

    //=====================================================================================
    // Persistence
    //=====================================================================================

    fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot {
            messages: self.messages.clone(),
            sources: self.sources.sources().to_vec(),
        }
    }

    /// Writes the visible transcript and source flags under the active thread.
    pub(crate) async fn persist_active(&mut self) {
        let Some(id) = self.threads.active_id() else {
            return;
        };
        let snapshot = self.snapshot();
        if let Err(e) = self.store.save_snapshot(id, &snapshot).await {
            self.storage_failed(e);
        }
    }

    /// Writes the shared document list. Every thread sees the same sources.
    pub(crate) async fn persist_sources(&mut self) {
        if let Err(e) = self.store.save_sources(self.sources.sources()).await {
            self.storage_failed(e);
        }
    }

    pub(crate) async fn persist_threads(&mut self) {
        let result = async {
            self.store.save_threads(self.threads.threads()).await?;
            self.store.save_active_thread(self.threads.active_id()).await
        }
        .await;
        if let Err(e) = result {
            self.storage_failed(e);
        }
    }

    async fn load_active_snapshot(&mut self) {
        let Some(id) = self.threads.active_id() else {
            self.messages = seed_messages();
            return;
        };
        match self.store.load_snapshot(id).await {
            Ok(Some(snapshot)) => {
                self.messages = snapshot.messages;
                self.sources.apply_flags(&snapshot.sources);
                self.persist_sources().await;
            }
            Ok(None) => self.messages = seed_messages(),
            Err(e) => {
                self.storage_failed(e);
                self.messages = seed_messages();
            }
        }
    }

    pub(crate) fn storage_failed(&mut self, e: PortError) {
        error!("Local storage failed: {}", e);
        self.notices
            .error(format!("Could not save your conversations: {}", e));
    }

    //=====================================================================================
    // Threads
    //=====================================================================================

    pub async fn new_thread(&mut self) -> Uuid {
        self.create_thread(DEFAULT_TITLE).await
    }

    pub(crate) async fn create_thread(&mut self, title: impl Into<String>) -> Uuid {
        self.persist_active().await;
        let id = self.threads.create(title, Utc::now());
        self.messages = seed_messages();
        self.persist_threads().await;
        self.persist_active().await;
        info!("Created thread {}", id);
        id
    }

    /// Saves the current thread, then loads `id` (or the seed pair when it
    /// has nothing stored).
    pub async fn select_thread(&mut self, id: Uuid) -> Result<(), AppError> {
        if !self.threads.contains(id) {
            return Err(AppError::ThreadNotFound(id));
        }
        if self.threads.active_id() == Some(id) {
            return Ok(());
        }
        self.persist_active().await;
        self.threads.activate(id)?;
        self.load_active_snapshot().await;
        self.persist_threads().await;
        Ok(())
    }

    pub async fn rename_thread(&mut self, id: Uuid, title: &str) -> Result<(), AppError> {
        self.threads.rename(id, title, Utc::now())?;
        self.persist_threads().await;
        Ok(())
    }

    pub async fn set_thread_icon(&mut self, id: Uuid, icon: &str) -> Result<(), AppError> {
        self.threads.set_icon(id, icon, Utc::now())?;
        self.persist_threads().await;
        Ok(())
    }

    pub async fn delete_thread(&mut self, id: Uuid) -> Result<(), AppError> {
        let was_active = self.threads.active_id() == Some(id);
        let removed = self.threads.remove(id)?;
        if let Err(e) = self.store.delete_snapshot(id).await {
            self.storage_failed(e);
        }
        if was_active {
            self.load_active_snapshot().await;
        }
        self.persist_threads().await;
        info!("Deleted thread {} ('{}')", id, removed.title);
        Ok(())
    }

    //=====================================================================================
    // Sources & Retrieval
    //=====================================================================================

    pub async fn toggle_source(&mut self, file_id: &str) -> Result<bool, AppError> {
        let enabled = self.sources.toggle(file_id)?;
        self.persist_sources().await;
        self.persist_active().await;
        Ok(enabled)
    }

    /// Sets every source's flag. Enabling all of them also switches retrieval
    /// on (see [`select_all_forces_retrieval`]).
    pub async fn set_all_sources(&mut self, enabled: bool) {
        self.sources.set_all(enabled);
        if select_all_forces_retrieval(enabled, self.sources.len()) {
            self.use_rag = true;
        }
        self.persist_sources().await;
        self.persist_active().await;
    }

    pub async fn delete_source(&mut self, file_id: &str) -> Result<(), AppError> {
        let removed = self.sources.remove(file_id)?;
        self.previews.remove(file_id);
        if self.open_preview.as_deref() == Some(file_id) {
            self.open_preview = None;
        }
        if self.target.as_ref().is_some_and(|t| t.file_id == file_id) {
            info!("Deleted the retrieval target {}; document mode is off", file_id);
            self.target = None;
            self.use_rag = false;
            self.recommended.clear();
        }
        self.notices.info(format!("Removed {}", removed.filename));
        self.persist_sources().await;
        self.persist_active().await;
        Ok(())
    }

    /// The user-facing "use document" switch.
    pub fn set_retrieval(&mut self, enabled: bool) {
        if enabled && self.target.is_none() {
            self.notices
                .info("Upload a document first to turn on document mode.");
            return;
        }
        self.use_rag = enabled;
    }

    //=====================================================================================
    // Uploads
    //=====================================================================================

    pub fn drag_enter(&mut self) {
        self.upload.drag_enter();
    }

    pub fn drag_leave(&mut self) {
        self.upload.drag_leave();
    }

    pub async fn drop_file(&mut self, file: LocalFile) -> bool {
        self.upload.drag_leave();
        self.upload_file(file).await
    }

    /// Uploads a picked file. Returns whether the document was indexed.
    pub async fn upload_file(&mut self, file: LocalFile) -> bool {
        let backend = self.backend.clone();
        match self.upload.upload(backend.as_ref(), &file).await {
            Ok(success) => {
                self.apply_upload(success).await;
                true
            }
            Err(e) => {
                self.notices.error(e.to_string());
                false
            }
        }
    }

    async fn apply_upload(&mut self, success: UploadSuccess) {
        let UploadSuccess {
            result,
            preview_url,
        } = success;

        let source = Source::from_upload(&result, Utc::now());
        self.target = Some(UploadTarget::from(&source));
        self.sources.insert(source);
        self.persist_sources().await;
        self.previews.insert(result.file_id.clone(), preview_url);
        self.use_rag = true;
        self.recommended = result.recommended_actions.clone();

        if self.threads.active_id().is_none() {
            self.create_thread(title_from_filename(&result.filename)).await;
        }

        self.messages.push(Message::system(format!(
            "📄 {} uploaded: {} page(s), {} chunk(s) indexed. Document mode is on.",
            result.filename, result.pages, result.chunks_indexed
        )));
        self.notices.success(format!("{} is ready", result.filename));
        self.persist_active().await;
    }

    pub fn dismiss_recommendations(&mut self) {
        self.recommended.clear();
    }

    pub fn open_preview(&mut self, file_id: &str) -> Result<(), AppError> {
        if self.sources.get(file_id).is_none() {
            return Err(AppError::SourceNotFound(file_id.to_string()));
        }
        if !self.previews.contains_key(file_id) {
            return Err(AppError::Validation(
                "A preview is only available for files uploaded in this session".to_string(),
            ));
        }
        self.open_preview = Some(file_id.to_string());
        Ok(())
    }

    pub fn close_preview(&mut self) {
        self.open_preview = None;
    }

    //=====================================================================================
    // Notices, Export & Health
    //=====================================================================================

    pub fn dismiss_notice(&mut self, id: NoticeId) -> bool {
        self.notices.dismiss(id)
    }

    pub fn expire_notices(&mut self) -> usize {
        self.notices.expire(Utc::now())
    }

    pub fn export_transcript(&self) -> String {
        let title = self
            .threads
            .active()
            .map(|t| t.title.as_str())
            .unwrap_or(DEFAULT_TITLE);
        export::render_transcript(title, &self.messages, Utc::now())
    }

    /// Probes `GET /api/health` and reports the result as a notice.
    pub async fn check_health(&mut self) -> bool {
        match self.backend.health().await {
            Ok(status) if status.is_ok() => {
                info!("Backend is healthy");
                self.notices.success("Backend is online");
                true
            }
            Ok(status) => {
                warn!("Backend reported status '{}'", status.status);
                self.notices
                    .error(format!("Backend reported status '{}'", status.status));
                false
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                self.notices.error("Cannot reach the server.");
                false
            }
        }
    }
}
