pub mod export;
pub mod notices;
pub mod query_task;
pub mod sources;
pub mod state;
pub mod threads;
pub mod upload;

// Re-export the controller and the types its callers handle most.
pub use notices::{Notice, NoticeId, NoticeKind};
pub use query_task::{PendingQuery, QueryOutcome};
pub use state::{ChatApp, PageMode, Settings, UploadTarget};
pub use upload::{LocalFile, UploadState};
