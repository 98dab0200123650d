//! SQLite-backed vector store.
//!
//! In-process store using SQLite for chunks and metadata and brute-force
//! cosine similarity for search. Lives in its own file inside the persist
//! directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, StoredChunk, VectorStore};
use crate::core::errors::BotError;

pub const STORE_FILE_NAME: &str = "docstore.db";

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Opens the store inside `persist_dir`, creating an empty one if absent.
    pub async fn open(persist_dir: &Path) -> Result<Self, BotError> {
        std::fs::create_dir_all(persist_dir).map_err(BotError::storage)?;
        Self::with_path(persist_dir.join(STORE_FILE_NAME)).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, BotError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), BotError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_index_chunks_source ON index_chunks(source)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: Option<String> = row.get("metadata");
        let metadata = metadata_str.and_then(|s| serde_json::from_str::<Value>(&s).ok());

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            metadata,
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn replace_source(
        &self,
        source: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, BotError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM index_chunks WHERE source = ?1")
            .bind(source)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = chunk
                .metadata
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO index_chunks (chunk_id, content, source, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed as usize)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, BotError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, metadata, embedding
             FROM index_chunks",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored_emb);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, BotError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_chunks")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }

    async fn embedding_model(&self) -> Result<Option<String>, BotError> {
        let model = sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'embedding_model'")
            .fetch_optional(&self.pool)
            .await?;
        Ok(model)
    }

    async fn reindex_with_model(&self, embedding_model: &str) -> Result<(), BotError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM index_chunks")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT OR REPLACE INTO index_meta (key, value, updated_at)
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(embedding_model)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn persist(&self) -> Result<(), BotError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
