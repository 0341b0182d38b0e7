//! Persistence layer — libSQL-backed chat history.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{ChatRecord, HistorySink};
