//! services/client/src/app/notices.rs
//!
//! Transient, user-visible notices ("toasts"). Ids come from a counter owned by
//! the `NoticeCenter`, so two controllers never share numbering.

use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoticeId(u64);

impl NoticeId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub kind: NoticeKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NoticeCenter {
    next_id: u64,
    ttl: Duration,
    notices: Vec<Notice>,
}

impl NoticeCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            next_id: 1,
            ttl,
            notices: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: NoticeKind, text: impl Into<String>) -> NoticeId {
        self.push_at(kind, text, Utc::now())
    }

    pub fn push_at(
        &mut self,
        kind: NoticeKind,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> NoticeId {
        let id = NoticeId(self.next_id);
        self.next_id += 1;
        self.notices.push(Notice {
            id,
            kind,
            text: text.into(),
            created_at: now,
        });
        id
    }

    pub fn info(&mut self, text: impl Into<String>) -> NoticeId {
        self.push(NoticeKind::Info, text)
    }

    pub fn success(&mut self, text: impl Into<String>) -> NoticeId {
        self.push(NoticeKind::Success, text)
    }

    pub fn error(&mut self, text: impl Into<String>) -> NoticeId {
        self.push(NoticeKind::Error, text)
    }

    /// Returns `false` if the notice was already gone.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    /// Drops notices older than the TTL and returns how many were removed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.notices.len();
        self.notices.retain(|n| match (now - n.created_at).to_std() {
            Ok(age) => age < ttl,
            // Created "in the future" relative to `now`: keep it.
            Err(_) => true,
        });
        before - self.notices.len()
    }

    pub fn active(&self) -> &[Notice] {
        &self.notices
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.notices.last()
    }
}
