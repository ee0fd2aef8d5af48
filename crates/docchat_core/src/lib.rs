pub mod domain;
pub mod ports;

pub use domain::{
    Citation, HealthStatus, HistoryTurn, Message, QueryRequest, QueryResponse, QueryType, Role,
    Source, SourceType, Thread, ThreadSnapshot, UploadResult,
};
pub use ports::{ChatBackend, PortError, PortResult, SnapshotStore};
