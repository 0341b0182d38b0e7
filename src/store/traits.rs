//! History sink trait — the pipeline's only persistence obligation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// A persisted chat exchange.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatRecord {
    pub id: String,
    pub user_message: String,
    pub bot_response: String,
    pub mood: String,
    pub timestamp: DateTime<Utc>,
}

/// Write dependency for processed messages.
///
/// The sink owns record lifecycle, querying, and deletion; the pipeline only
/// supplies the four fields after computing a reply.
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Persist one exchange. Returns the generated record id.
    async fn record(
        &self,
        user_message: &str,
        bot_response: &str,
        mood: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<String, DatabaseError>;

    /// Fetch the most recent exchanges, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, DatabaseError>;
}
