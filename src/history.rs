use sqlx::{Row, SqlitePool};

use crate::core::errors::BotError;
use crate::db::Database;
use crate::llm::types::{ChatMessage, Role};

/// A persisted transcript row.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub id: i64,
    pub channel_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl From<TranscriptEntry> for ChatMessage {
    fn from(entry: TranscriptEntry) -> Self {
        ChatMessage {
            role: entry.role,
            content: entry.content,
        }
    }
}

/// Append-only log of chat messages keyed by channel (conversation) id.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    pool: SqlitePool,
}

impl TranscriptStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn append(&self, channel_id: &str, role: Role, content: &str) -> Result<(), BotError> {
        sqlx::query("INSERT INTO chat_messages (channel_id, role, content) VALUES (?1, ?2, ?3)")
            .bind(channel_id)
            .bind(role.as_str())
            .bind(content)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Full history for a channel, oldest first.
    pub async fn history(&self, channel_id: &str) -> Result<Vec<TranscriptEntry>, BotError> {
        let rows = sqlx::query(
            "\
            SELECT id, channel_id, role, content, timestamp
            FROM chat_messages
            WHERE channel_id = ?1
            ORDER BY timestamp ASC, id ASC",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }

    /// Removes every message of a channel and returns how many were deleted.
    pub async fn clear(&self, channel_id: &str) -> Result<u64, BotError> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE channel_id = ?1")
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn entry_from_row(row: sqlx::sqlite::SqliteRow) -> Result<TranscriptEntry, BotError> {
    let role: String = row.try_get("role")?;
    let role = role.parse::<Role>().map_err(BotError::Storage)?;

    Ok(TranscriptEntry {
        id: row.try_get("id")?,
        channel_id: row.try_get("channel_id")?,
        role,
        content: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
    })
}
