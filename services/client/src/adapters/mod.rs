pub mod db;
pub mod http;
pub mod memory;

pub use db::SqliteStore;
pub use http::HttpBackend;
pub use memory::MemoryStore;
