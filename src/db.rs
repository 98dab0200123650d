//! Shared SQLite handle for ticket metadata and chat transcripts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::core::errors::BotError;

#[derive(Debug, Clone)]
pub struct Database {
    db_path: PathBuf,
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self, BotError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(BotError::storage)?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options)
            .await?;

        let db = Self { db_path, pool };
        db.init_schema().await?;
        tracing::info!("Opened database at {}", db.db_path.display());
        Ok(db)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection. Later queries fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<(), BotError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "\
            CREATE TABLE IF NOT EXISTS support_tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "\
            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('system', 'user', 'assistant')),
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_channel_id ON chat_messages(channel_id, timestamp, id)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_database() -> Database {
    let tmp = std::env::temp_dir().join(format!("discollama-test-{}.db", uuid::Uuid::new_v4()));
    Database::open(tmp).await.unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let db = test_database().await;
        let path = db.db_path().to_path_buf();
        db.close().await;

        let reopened = Database::open(&path).await.unwrap();
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(reopened.pool())
        .await
        .unwrap();

        assert_eq!(tables, vec!["chat_messages", "support_tickets"]);
    }

    #[tokio::test]
    async fn queries_fail_after_close() {
        let db = test_database().await;
        db.close().await;

        let err: BotError = sqlx::query("SELECT 1")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(err.is_storage());
    }
}
