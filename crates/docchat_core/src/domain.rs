//! crates/docchat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the chat client: threads, the
//! messages they own, uploaded sources, and the payloads exchanged with the
//! document backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Threads and Messages
//=========================================================================================

/// An independent conversation with its own message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub title: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who authored a message. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
            Role::System => "system",
        }
    }
}

/// A document excerpt reference attached to a bot answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub file: String,
    /// The backend reports `"?"` when the chunk carried no page metadata.
    #[serde(default, deserialize_with = "page_from_any")]
    pub page: Option<u32>,
}

impl Citation {
    pub fn label(&self) -> String {
        match self.page {
            Some(page) => format!("{} (p. {})", self.file, page),
            None => self.file.clone(),
        }
    }
}

fn page_from_any<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPage {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<RawPage>::deserialize(deserializer)? {
        Some(RawPage::Number(n)) if n >= 0.0 => Some(n as u32),
        Some(RawPage::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A single entry in a thread's transcript. Messages are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl Message {
    fn new(role: Role, text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            citations,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text, Vec::new())
    }

    pub fn bot(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self::new(Role::Bot, text, citations)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text, Vec::new())
    }
}

//=========================================================================================
// Sources (uploaded documents)
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Image,
    #[serde(other)]
    Unknown,
}

impl SourceType {
    /// Classifies a file by extension the same way the ingestion backend does.
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => SourceType::Pdf,
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tiff" | "webp" => SourceType::Image,
            _ => SourceType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Pdf => "pdf",
            SourceType::Image => "image",
            SourceType::Unknown => "unknown",
        }
    }
}

/// A document that was uploaded and indexed by the backend.
///
/// Sources are shared by every thread. `enabled` only decides whether the
/// document is eligible for retrieval; the server-side index is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub file_id: String,
    pub filename: String,
    pub pages: u32,
    pub chunks: u32,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub uploaded_at: DateTime<Utc>,
    pub enabled: bool,
}

impl Source {
    pub fn from_upload(result: &UploadResult, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            file_id: result.file_id.clone(),
            filename: result.filename.clone(),
            pages: result.pages,
            chunks: result.chunks_indexed,
            source_type: result.doc_type,
            uploaded_at,
            enabled: true,
        }
    }
}

/// The persisted state of one thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub messages: Vec<Message>,
    pub sources: Vec<Source>,
}

//=========================================================================================
// Backend Payloads
//=========================================================================================

/// The normalized response of `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub file_id: String,
    pub filename: String,
    pub pages: u32,
    pub chunks_indexed: u32,
    #[serde(rename = "type")]
    pub doc_type: SourceType,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

/// The kind of answer requested from the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Freeform,
    Summarize,
    Quiz,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Freeform => "freeform",
            QueryType::Summarize => "summarize",
            QueryType::Quiz => "quiz",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "freeform" => Ok(QueryType::Freeform),
            "summarize" => Ok(QueryType::Summarize),
            "quiz" => Ok(QueryType::Quiz),
            other => Err(format!("unknown query type '{}'", other)),
        }
    }
}

/// One prior conversation turn sent along with a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub text: String,
}

/// The JSON body of `POST /api/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub file_id: Option<String>,
    pub filename: Option<String>,
    pub query: String,
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub use_rag: bool,
    pub history: Vec<HistoryTurn>,
}

/// The JSON response of `POST /api/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<Citation>>,
}

/// The JSON response of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
