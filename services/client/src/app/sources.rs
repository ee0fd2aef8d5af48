//! services/client/src/app/sources.rs
//!
//! Uploaded documents shared by every thread, each with an enable flag that
//! decides whether it can back a retrieval query.

use crate::error::AppError;
use docchat_core::domain::Source;

/// Selecting every source turns retrieval on, provided there is at least one
/// source to retrieve from. Deselecting never touches the retrieval flag.
pub fn select_all_forces_retrieval(enabled: bool, source_count: usize) -> bool {
    enabled && source_count > 0
}

#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn get(&self, file_id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.file_id == file_id)
    }

    pub fn is_enabled(&self, file_id: &str) -> bool {
        self.get(file_id).map(|s| s.enabled).unwrap_or(false)
    }

    pub fn any_enabled(&self) -> bool {
        self.sources.iter().any(|s| s.enabled)
    }

    /// The most recently uploaded source that is still enabled.
    pub fn latest_enabled(&self) -> Option<&Source> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .max_by_key(|s| s.uploaded_at)
    }

    /// The most recently uploaded source, enabled or not.
    pub fn latest(&self) -> Option<&Source> {
        self.sources.iter().max_by_key(|s| s.uploaded_at)
    }

    /// Adds a source. A source with the same file id is replaced in place;
    /// no other deduplication happens.
    pub fn insert(&mut self, source: Source) {
        match self.sources.iter_mut().find(|s| s.file_id == source.file_id) {
            Some(existing) => *existing = source,
            None => self.sources.push(source),
        }
    }

    /// Flips one source and returns its new state.
    pub fn toggle(&mut self, file_id: &str) -> Result<bool, AppError> {
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.file_id == file_id)
            .ok_or_else(|| AppError::SourceNotFound(file_id.to_string()))?;
        source.enabled = !source.enabled;
        Ok(source.enabled)
    }

    pub fn set_all(&mut self, enabled: bool) {
        for source in &mut self.sources {
            source.enabled = enabled;
        }
    }

    pub fn remove(&mut self, file_id: &str) -> Result<Source, AppError> {
        let idx = self
            .sources
            .iter()
            .position(|s| s.file_id == file_id)
            .ok_or_else(|| AppError::SourceNotFound(file_id.to_string()))?;
        Ok(self.sources.remove(idx))
    }

    /// Re-applies enable flags recorded in a thread snapshot. Sources deleted
    /// since the snapshot was taken are not brought back, and sources uploaded
    /// after it keep their current flag.
    pub fn apply_flags(&mut self, recorded: &[Source]) {
        for source in &mut self.sources {
            if let Some(saved) = recorded.iter().find(|r| r.file_id == source.file_id) {
                source.enabled = saved.enabled;
            }
        }
    }
}
