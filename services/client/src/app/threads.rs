//! services/client/src/app/threads.rs
//!
//! The ordered list of conversation threads and the active-thread pointer.
//! Loading and saving snapshots is the page controller's job; this registry
//! only keeps the list consistent.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use docchat_core::domain::{Message, Thread};
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "New Chat";
pub const THREAD_ICONS: [&str; 8] = ["💬", "📄", "📚", "🧠", "💡", "🔬", "📝", "⭐"];
pub const DEFAULT_ICON: &str = THREAD_ICONS[0];
const MAX_TITLE_CHARS: usize = 30;

/// The fixed opening pair shown in every fresh thread.
pub fn seed_messages() -> Vec<Message> {
    vec![
        Message::system("New conversation started."),
        Message::bot(
            "Hi! Ask me anything, or upload a PDF or image and I'll answer from the document.",
            Vec::new(),
        ),
    ]
}

/// `manual.v2.pdf` -> `manual.v2`, cut to 30 characters.
pub fn title_from_filename(filename: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };
    truncate_title(stem)
}

/// Titles a thread after the first line of the message that opened it.
pub fn title_from_text(text: &str) -> String {
    truncate_title(text.lines().next().unwrap_or_default())
}

fn truncate_title(raw: &str) -> String {
    let title: String = raw.trim().chars().take(MAX_TITLE_CHARS).collect();
    let title = title.trim_end().to_string();
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

#[derive(Debug, Default, Clone)]
pub struct ThreadRegistry {
    threads: Vec<Thread>,
    active: Option<Uuid>,
}

impl ThreadRegistry {
    /// Rebuilds the registry from stored state. A stored active id that no
    /// longer names a thread falls back to the first thread.
    pub fn restore(threads: Vec<Thread>, active: Option<Uuid>) -> Self {
        let active = active
            .filter(|id| threads.iter().any(|t| t.id == *id))
            .or_else(|| threads.first().map(|t| t.id));
        Self { threads, active }
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.active
    }

    pub fn active(&self) -> Option<&Thread> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: Uuid) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    /// Inserts a new thread at the head of the list and makes it active.
    pub fn create(&mut self, title: impl Into<String>, now: DateTime<Utc>) -> Uuid {
        let thread = Thread {
            id: Uuid::new_v4(),
            title: title.into(),
            icon: DEFAULT_ICON.to_string(),
            created_at: now,
            updated_at: now,
        };
        let id = thread.id;
        self.threads.insert(0, thread);
        self.active = Some(id);
        id
    }

    pub fn activate(&mut self, id: Uuid) -> Result<(), AppError> {
        if !self.contains(id) {
            return Err(AppError::ThreadNotFound(id));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn rename(&mut self, id: Uuid, title: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Thread title cannot be empty".to_string()));
        }
        let thread = self.get_mut(id)?;
        thread.title = title.to_string();
        thread.updated_at = now;
        Ok(())
    }

    pub fn set_icon(&mut self, id: Uuid, icon: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        if !THREAD_ICONS.contains(&icon) {
            return Err(AppError::Validation(format!(
                "Unknown icon '{}'. Choose one of: {}",
                icon,
                THREAD_ICONS.join(" ")
            )));
        }
        let thread = self.get_mut(id)?;
        thread.icon = icon.to_string();
        thread.updated_at = now;
        Ok(())
    }

    /// Removes a thread. If it was active, the first remaining thread becomes
    /// active, or nothing is active when the list is now empty.
    pub fn remove(&mut self, id: Uuid) -> Result<Thread, AppError> {
        let idx = self
            .threads
            .iter()
            .position(|t| t.id == id)
            .ok_or(AppError::ThreadNotFound(id))?;
        let removed = self.threads.remove(idx);
        if self.active == Some(id) {
            self.active = self.threads.first().map(|t| t.id);
        }
        Ok(removed)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Thread, AppError> {
        self.threads
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AppError::ThreadNotFound(id))
    }
}
