//! libSQL history sink — async `HistorySink` over a local SQLite file.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{ChatRecord, HistorySink};

/// libSQL-backed history sink.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&backend.conn).await?;
        info!(path = %path.display(), "History database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&backend.conn).await?;
        Ok(backend)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql Row to a ChatRecord.
///
/// Column order: 0:id, 1:user_message, 2:bot_response, 3:mood, 4:timestamp
fn row_to_record(row: &libsql::Row) -> Result<ChatRecord, libsql::Error> {
    let timestamp_str: String = row.get(4)?;
    Ok(ChatRecord {
        id: row.get(0)?,
        user_message: row.get(1)?,
        bot_response: row.get(2)?,
        mood: row.get(3)?,
        timestamp: parse_datetime(&timestamp_str),
    })
}

#[async_trait]
impl HistorySink for LibSqlBackend {
    async fn record(
        &self,
        user_message: &str,
        bot_response: &str,
        mood: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO chat_history (id, user_message, bot_response, mood, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.clone(),
                    user_message,
                    bot_response,
                    mood,
                    timestamp.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert chat_history: {e}")))?;
        debug!(id = %id, "Chat exchange persisted");
        Ok(id)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_message, bot_response, mood, timestamp
                 FROM chat_history ORDER BY timestamp DESC LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("select chat_history: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            records.push(row_to_record(&row).map_err(|e| DatabaseError::Query(e.to_string()))?);
        }
        Ok(records)
    }
}
