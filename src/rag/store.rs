//! VectorStore trait: abstract interface for embedding storage backends.
//!
//! The only implementation is `SqliteVectorStore` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::BotError;

/// A stored chunk with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source identifier (URL, file path).
    pub source: String,
    /// Optional metadata (JSON).
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Similarity score (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Swap every chunk of `source` for `items` in one transaction.
    /// Returns how many old chunks were removed.
    async fn replace_source(
        &self,
        source: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, BotError>;

    /// Search for chunks similar to the query embedding.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, BotError>;

    async fn count(&self) -> Result<usize, BotError>;

    /// Embedding model the stored vectors were produced with, if recorded.
    async fn embedding_model(&self) -> Result<Option<String>, BotError>;

    /// Drop every vector and record the new embedding model.
    async fn reindex_with_model(&self, embedding_model: &str) -> Result<(), BotError>;

    /// Flush everything to the on-disk files.
    async fn persist(&self) -> Result<(), BotError>;

    async fn close(&self);
}
