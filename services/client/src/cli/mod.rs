//! services/client/src/cli/mod.rs
//!
//! The terminal front end: turns parsed commands into controller intents and
//! renders the page view as plain text.

pub mod command;

pub use command::{Command, ParseError, HELP};

use crate::app::export::export_file_name;
use crate::app::{ChatApp, LocalFile, NoticeKind, PageMode, QueryOutcome};
use crate::error::AppError;
use crate::view::{progress_bar, PageView};
use chrono::Utc;
use std::fmt::Write;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// What the input loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Redraw the page.
    Render,
    /// Print a short message without redrawing.
    Print(String),
    Quit,
}

fn thread_at(app: &ChatApp, index: usize) -> Result<Uuid, AppError> {
    index
        .checked_sub(1)
        .and_then(|i| app.threads().get(i))
        .map(|t| t.id)
        .ok_or_else(|| AppError::Validation(format!("There is no thread #{}", index)))
}

async fn read_file(path: &Path) -> Result<LocalFile, AppError> {
    LocalFile::read(path).await.map_err(|e| {
        warn!("Could not read {}: {}", path.display(), e);
        AppError::Validation(format!("Cannot read {}: {}", path.display(), e))
    })
}

/// Applies one command to the controller.
pub async fn dispatch(app: &mut ChatApp, command: Command) -> Result<Flow, AppError> {
    match command {
        Command::Send(text) => {
            let outcome = app.send_message(&text).await;
            if outcome == QueryOutcome::Ignored {
                return Ok(Flow::Print(String::new()));
            }
        }

        // --- Threads ---
        Command::NewThread => {
            app.new_thread().await;
        }
        Command::ListThreads => return Ok(Flow::Print(render_threads(&PageView::from_app(app)))),
        Command::SelectThread(index) => {
            let id = thread_at(app, index)?;
            app.select_thread(id).await?;
        }
        Command::RenameThread { index, title } => {
            let id = thread_at(app, index)?;
            app.rename_thread(id, &title).await?;
        }
        Command::SetIcon { index, icon } => {
            let id = thread_at(app, index)?;
            app.set_thread_icon(id, &icon).await?;
        }
        Command::DeleteThread(index) => {
            let id = thread_at(app, index)?;
            app.delete_thread(id).await?;
        }

        // --- Documents ---
        Command::Upload(path) => {
            let file = read_file(&path).await?;
            app.upload_file(file).await;
        }
        Command::Drop(path) => {
            app.drag_enter();
            match read_file(&path).await {
                Ok(file) => {
                    app.drop_file(file).await;
                }
                Err(e) => {
                    app.drag_leave();
                    return Err(e);
                }
            }
        }
        Command::ListSources => return Ok(Flow::Print(render_sources(&PageView::from_app(app)))),
        Command::ToggleSource(file_id) => {
            app.toggle_source(&file_id).await?;
        }
        Command::SetAllSources(enabled) => app.set_all_sources(enabled).await,
        Command::SetRetrieval(enabled) => app.set_retrieval(enabled),
        Command::DeleteSource(file_id) => app.delete_source(&file_id).await?,
        Command::Preview(file_id) => app.open_preview(&file_id)?,
        Command::ClosePreview => app.close_preview(),

        // --- Recommended actions ---
        Command::Action(query_type) => {
            app.run_recommended_action(query_type.as_str()).await;
        }
        Command::DismissBanner => app.dismiss_recommendations(),

        // --- Misc ---
        Command::Export(path) => {
            let title = app
                .active_thread()
                .map(|t| t.title.clone())
                .unwrap_or_default();
            let path = path.unwrap_or_else(|| export_file_name(&title, Utc::now()).into());
            tokio::fs::write(&path, app.export_transcript())
                .await
                .map_err(|e| AppError::Validation(format!("Cannot write {}: {}", path.display(), e)))?;
            info!("Transcript exported to {}", path.display());
            return Ok(Flow::Print(format!("Saved transcript to {}", path.display())));
        }
        Command::Copy(index) => {
            let text = index
                .checked_sub(1)
                .and_then(|i| app.messages().get(i))
                .map(|m| m.text.clone())
                .ok_or_else(|| AppError::Validation(format!("There is no message #{}", index)))?;
            return Ok(Flow::Print(text));
        }
        Command::DismissNotice => {
            if let Some(id) = app.notices().last().map(|n| n.id) {
                app.dismiss_notice(id);
            }
        }
        Command::Health => {
            app.check_health().await;
        }
        Command::Help => return Ok(Flow::Print(HELP.to_string())),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Render)
}

//=========================================================================================
// Text rendering
//=========================================================================================

fn render_threads(view: &PageView) -> String {
    let mut out = String::from("Threads\n");
    if view.threads.is_empty() {
        out.push_str("  (none yet)\n");
    }
    for (i, thread) in view.threads.iter().enumerate() {
        let marker = if thread.active { '>' } else { ' ' };
        let _ = writeln!(out, "{} {}. {} {}", marker, i + 1, thread.icon, thread.title);
    }
    out
}

fn render_sources(view: &PageView) -> String {
    let mut out = String::from("Sources\n");
    if view.sources.is_empty() {
        out.push_str("  (no documents)\n");
    }
    for source in &view.sources {
        let _ = writeln!(
            out,
            "  [{}] {} ({}, {} page(s), {} chunk(s)) id={}{}",
            if source.enabled { 'x' } else { ' ' },
            source.filename,
            source.kind,
            source.pages,
            source.chunks,
            source.file_id,
            if source.is_target { "  ← target" } else { "" }
        );
    }
    if !view.sources.is_empty() {
        let _ = writeln!(
            out,
            "  select all: {}",
            if view.all_sources_enabled { "on" } else { "off" }
        );
    }
    out
}

/// Renders the whole page as text, top to bottom: thread list, transcript,
/// banner, sources, upload widget, preview and notices.
pub fn render(view: &PageView) -> String {
    let mut out = String::new();

    let mode = match view.mode {
        PageMode::NoDocument => "no document".to_string(),
        PageMode::DocumentUploaded { retrieval } => {
            format!("document mode {}", if retrieval { "on" } else { "off" })
        }
    };
    let _ = writeln!(out, "──── DocChat ({}) ────", mode);
    out.push_str(&render_threads(view));
    out.push('\n');

    for (i, entry) in view.transcript.iter().enumerate() {
        let _ = writeln!(out, "#{} {}:", i + 1, entry.label);
        for line in &entry.lines {
            let _ = writeln!(out, "  {}", line);
        }
        if !entry.badges.is_empty() {
            let _ = writeln!(out, "  📎 {}", entry.badges.join(" | "));
        }
    }
    if view.typing {
        out.push_str("Assistant is typing…\n");
    }
    out.push('\n');

    if !view.banner.is_empty() {
        let actions: Vec<String> = view.banner.iter().map(|a| format!("/{}", a)).collect();
        let _ = writeln!(out, "Try: {}   (/dismiss to hide)", actions.join("  "));
    }

    out.push_str(&render_sources(view));
    let _ = writeln!(out, "Upload: {}", view.upload.caption());

    if let Some(preview) = &view.preview {
        let _ = writeln!(
            out,
            "Preview: {} [{}] {} byte(s) of data URL  (/close to hide)",
            preview.filename,
            preview.kind,
            preview.url.len()
        );
    }

    for notice in &view.notices {
        let tag = match notice.kind {
            NoticeKind::Info => "info",
            NoticeKind::Success => "ok",
            NoticeKind::Error => "error",
        };
        let _ = writeln!(out, "({}) {}", tag, notice.text);
    }
    out
}

/// One-line progress readout used while an upload runs.
pub fn render_progress(progress: u8) -> String {
    format!("Uploading {}", progress_bar(progress, 30))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::app::Settings;
    use async_trait::async_trait;
    use docchat_core::domain::{HealthStatus, QueryRequest, QueryResponse, UploadResult};
    use docchat_core::ports::{ChatBackend, PortError, PortResult};
    use std::sync::Arc;

    /// A backend that is never reachable.
    struct Offline;

    #[async_trait]
    impl ChatBackend for Offline {
        async fn upload_document(&self, _: &str, _: &[u8]) -> PortResult<UploadResult> {
            Err(PortError::Unreachable("offline".to_string()))
        }
        async fn query(&self, _: &QueryRequest) -> PortResult<QueryResponse> {
            Err(PortError::Unreachable("offline".to_string()))
        }
        async fn health(&self) -> PortResult<HealthStatus> {
            Err(PortError::Unreachable("offline".to_string()))
        }
    }

    fn app() -> ChatApp {
        ChatApp::new(
            Settings::default(),
            Arc::new(Offline),
            Arc::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn thread_commands_resolve_positions() {
        let mut app = app();
        dispatch(&mut app, Command::NewThread).await.unwrap();
        dispatch(&mut app, Command::NewThread).await.unwrap();
        dispatch(
            &mut app,
            Command::RenameThread {
                index: 2,
                title: "Older".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(app.threads()[1].title, "Older");
        assert!(matches!(
            dispatch(&mut app, Command::SelectThread(3)).await,
            Err(AppError::Validation(_))
        ));

        let Flow::Print(list) = dispatch(&mut app, Command::ListThreads).await.unwrap() else {
            panic!("expected a printed list");
        };
        assert!(list.contains("> 1. 💬 New Chat"));
        assert!(list.contains("  2. 💬 Older"));
    }

    #[tokio::test]
    async fn rendered_page_shows_seed_transcript_and_mode() {
        let app = app();
        let page = render(&PageView::from_app(&app));
        assert!(page.contains("DocChat (no document)"));
        assert!(page.contains("#1 System:"));
        assert!(page.contains("New conversation started."));
        assert!(page.contains("(no documents)"));
    }

    #[tokio::test]
    async fn copy_prints_the_raw_message() {
        let mut app = app();
        let flow = dispatch(&mut app, Command::Copy(1)).await.unwrap();
        assert_eq!(flow, Flow::Print("New conversation started.".to_string()));
        assert!(dispatch(&mut app, Command::Copy(9)).await.is_err());
    }

    #[tokio::test]
    async fn export_writes_the_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        let mut app = app();

        dispatch(&mut app, Command::Export(Some(path.clone())))
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[System] New conversation started."));
        assert!(text.contains("End of transcript"));
    }

    #[tokio::test]
    async fn missing_upload_file_is_reported_and_drag_state_resets() {
        let mut app = app();
        let result = dispatch(&mut app, Command::Drop("/definitely/not/here.pdf".into())).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(app.upload_state(), crate::app::UploadState::Idle);
    }

    #[test]
    fn progress_readout() {
        assert!(render_progress(30).ends_with("30%"));
    }
}
