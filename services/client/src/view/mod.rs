//! services/client/src/view/mod.rs
//!
//! View models for the three-column page: thread list, transcript and source
//! panel, plus the upload widget, recommend-actions banner, preview overlay and
//! notices. Everything here is derived from `ChatApp` and holds no state.

pub mod markdown;

use crate::app::{ChatApp, NoticeKind, PageMode, UploadState};
use docchat_core::domain::{Message, Role};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadItem {
    pub id: Uuid,
    pub title: String,
    pub icon: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub file_id: String,
    pub filename: String,
    pub kind: &'static str,
    pub pages: u32,
    pub chunks: u32,
    pub enabled: bool,
    pub is_target: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub role: Role,
    pub label: &'static str,
    /// Message body rendered from markdown.
    pub lines: Vec<String>,
    pub badges: Vec<String>,
    /// What the "copy" button puts on the clipboard.
    pub copy_text: String,
}

impl TranscriptEntry {
    pub fn from_message(message: &Message) -> Self {
        let label = match message.role {
            Role::User => "You",
            Role::Bot => "Assistant",
            Role::System => "System",
        };
        let lines = match message.role {
            Role::Bot => markdown::markdown_to_lines(&message.text),
            _ => message.text.lines().map(str::to_string).collect(),
        };
        Self {
            id: message.id,
            role: message.role,
            label,
            lines,
            badges: message.citations.iter().map(|c| c.label()).collect(),
            copy_text: message.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadWidget {
    pub state: UploadState,
    pub progress: u8,
}

impl UploadWidget {
    pub fn caption(&self) -> String {
        match self.state {
            UploadState::Idle if self.progress == 100 => "Upload complete".to_string(),
            UploadState::Idle => "Drop a PDF or image here, or pick a file".to_string(),
            UploadState::Dragging => "Release to upload".to_string(),
            UploadState::Uploading => format!("Uploading… {}", progress_bar(self.progress, 20)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOverlay {
    pub filename: String,
    pub kind: &'static str,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeItem {
    pub id: u64,
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub mode: PageMode,
    pub threads: Vec<ThreadItem>,
    pub sources: Vec<SourceItem>,
    pub all_sources_enabled: bool,
    pub transcript: Vec<TranscriptEntry>,
    pub typing: bool,
    pub upload: UploadWidget,
    /// Recommended actions; the banner is hidden when empty.
    pub banner: Vec<String>,
    pub preview: Option<PreviewOverlay>,
    pub notices: Vec<NoticeItem>,
}

impl PageView {
    pub fn from_app(app: &ChatApp) -> Self {
        let active = app.active_thread().map(|t| t.id);
        let target = app.target().map(|t| t.file_id.as_str());

        let threads = app
            .threads()
            .iter()
            .map(|t| ThreadItem {
                id: t.id,
                title: t.title.clone(),
                icon: t.icon.clone(),
                active: Some(t.id) == active,
            })
            .collect();

        let sources: Vec<SourceItem> = app
            .sources()
            .iter()
            .map(|s| SourceItem {
                file_id: s.file_id.clone(),
                filename: s.filename.clone(),
                kind: s.source_type.as_str(),
                pages: s.pages,
                chunks: s.chunks,
                enabled: s.enabled,
                is_target: Some(s.file_id.as_str()) == target,
            })
            .collect();
        let all_sources_enabled = !sources.is_empty() && sources.iter().all(|s| s.enabled);

        Self {
            mode: app.page_mode(),
            threads,
            sources,
            all_sources_enabled,
            transcript: app.messages().iter().map(TranscriptEntry::from_message).collect(),
            typing: app.is_typing(),
            upload: UploadWidget {
                state: app.upload_state(),
                progress: app.upload_progress(),
            },
            banner: app.recommended_actions().to_vec(),
            preview: app.preview().map(|(source, url)| PreviewOverlay {
                filename: source.filename.clone(),
                kind: source.source_type.as_str(),
                url: url.to_string(),
            }),
            notices: app
                .notices()
                .iter()
                .map(|n| NoticeItem {
                    id: n.id.value(),
                    kind: n.kind,
                    text: n.text.clone(),
                })
                .collect(),
        }
    }
}

/// `[#####-----] 50%`
pub fn progress_bar(progress: u8, width: usize) -> String {
    let progress = progress.min(100) as usize;
    let filled = progress * width / 100;
    format!(
        "[{}{}] {}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        progress
    )
}
