//! Retrieval index: chunk, embed, store and search documents.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::engine::{Chunker, RAGConfig};
use super::loader::Document;
use super::sqlite::SqliteVectorStore;
use super::store::{ChunkSearchResult, StoredChunk, VectorStore};
use crate::core::errors::BotError;
use crate::llm::LlmProvider;

pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    embedding_model: String,
    config: RAGConfig,
}

impl VectorIndex {
    /// Loads the index persisted in `persist_dir`, or creates an empty one.
    pub async fn open(
        persist_dir: &Path,
        llm: Arc<dyn LlmProvider>,
        embedding_model: &str,
        config: RAGConfig,
    ) -> Result<Self, BotError> {
        let existed = persist_dir.join(super::sqlite::STORE_FILE_NAME).exists();
        let store = Arc::new(SqliteVectorStore::open(persist_dir).await?);
        let index = Self::with_store(store, llm, embedding_model, config).await?;

        if existed {
            tracing::info!(
                "Loaded index from {} ({} chunks)",
                persist_dir.display(),
                index.len().await?
            );
        } else {
            tracing::info!("Created empty index at {}", persist_dir.display());
        }
        Ok(index)
    }

    pub async fn with_store(
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        embedding_model: &str,
        config: RAGConfig,
    ) -> Result<Self, BotError> {
        match store.embedding_model().await? {
            Some(recorded) if recorded == embedding_model => {}
            Some(recorded) => {
                tracing::warn!(
                    "Embedding model changed from {} to {}; clearing index",
                    recorded,
                    embedding_model
                );
                store.reindex_with_model(embedding_model).await?;
            }
            None => {
                if store.count().await? > 0 {
                    tracing::warn!("Index has no recorded embedding model; clearing index");
                }
                store.reindex_with_model(embedding_model).await?;
            }
        }

        Ok(Self {
            store,
            llm,
            embedding_model: embedding_model.to_string(),
            config,
        })
    }

    pub fn config(&self) -> &RAGConfig {
        &self.config
    }

    pub async fn len(&self) -> Result<usize, BotError> {
        self.store.count().await
    }

    /// Chunks and embeds `documents`, replacing earlier chunks of the same
    /// source, then persists. Returns the number of chunks written.
    ///
    /// A source's old chunks are only swapped out once all of its new chunks
    /// are embedded, so a failed embed leaves the previous version searchable.
    pub async fn insert_documents(&self, documents: &[Document]) -> Result<usize, BotError> {
        let chunker = Chunker::from_config(&self.config);
        let batch_size = self.config.embed_batch_size.max(1);
        let mut written = 0;

        for document in documents {
            let chunks = chunker.split(&document.text, &document.source);
            if chunks.is_empty() {
                continue;
            }

            let mut items = Vec::with_capacity(chunks.len());
            for batch in chunks.chunks(batch_size) {
                let inputs: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                let embeddings = self.llm.embed(&inputs, &self.embedding_model).await?;

                items.extend(batch.iter().zip(embeddings).map(|(chunk, embedding)| {
                    let stored = StoredChunk {
                        chunk_id: Uuid::new_v4().to_string(),
                        content: chunk.text.clone(),
                        source: chunk.source.clone(),
                        metadata: Some(json!({
                            "start_offset": chunk.start_offset,
                            "chunk_index": chunk.chunk_index,
                        })),
                    };
                    (stored, embedding)
                }));
            }

            written += items.len();
            self.store.replace_source(&document.source, items).await?;

            tracing::debug!("Indexed {} ({} chunks)", document.source, chunks.len());
        }

        self.store.persist().await?;
        Ok(written)
    }

    /// Top-k chunks for `query`. An empty index never calls the embedder.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ChunkSearchResult>, BotError> {
        if self.store.count().await? == 0 {
            return Ok(Vec::new());
        }

        let mut embeddings = self
            .llm
            .embed(&[query.to_string()], &self.embedding_model)
            .await?;
        let query_embedding = embeddings
            .pop()
            .ok_or_else(|| BotError::Llm("empty embedding response".to_string()))?;

        self.store
            .search(&query_embedding, self.config.similarity_top_k)
            .await
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{keyword_embedding, KeywordLlm};

    async fn open_index(dir: &Path, top_k: usize) -> VectorIndex {
        let config = RAGConfig {
            chunk_size: 64,
            chunk_overlap: 8,
            similarity_top_k: top_k,
            embed_batch_size: 2,
            ..Default::default()
        };
        VectorIndex::open(dir, Arc::new(KeywordLlm::default()), "keyword-embed", config)
            .await
            .unwrap()
    }

    fn doc(source: &str, text: &str) -> Document {
        Document {
            text: text.to_string(),
            source: source.to_string(),
        }
    }

    #[tokio::test]
    async fn retrieve_returns_most_relevant_chunk() {
        let tmp = tempfile::tempdir().unwrap();
        let index = open_index(tmp.path(), 1).await;

        let written = index
            .insert_documents(&[
                doc("gpu.md", "Ollama uses the gpu when cuda drivers are installed."),
                doc("install.md", "Install ollama with the install script on linux."),
            ])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let results = index.retrieve("how do I install it").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.source, "install.md");
    }

    #[tokio::test]
    async fn empty_index_retrieves_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let index = open_index(tmp.path(), 2).await;
        assert!(index.retrieve("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reingesting_a_source_replaces_its_chunks() {
        let tmp = tempfile::tempdir().unwrap();
        let index = open_index(tmp.path(), 2).await;

        let long = "Ollama serves models over http. ".repeat(10);
        index.insert_documents(&[doc("faq.md", &long)]).await.unwrap();
        let first = index.len().await.unwrap();
        assert!(first > 1);

        index
            .insert_documents(&[doc("faq.md", "Short answer.")])
            .await
            .unwrap();
        assert_eq!(index.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_embedding_keeps_previous_chunks() {
        let tmp = tempfile::tempdir().unwrap();
        let llm = Arc::new(KeywordLlm::default());
        let config = RAGConfig {
            chunk_size: 64,
            chunk_overlap: 8,
            similarity_top_k: 2,
            embed_batch_size: 2,
            ..Default::default()
        };
        let index = VectorIndex::open(tmp.path(), llm.clone(), "keyword-embed", config)
            .await
            .unwrap();

        let old = "Ollama serves models over http. ".repeat(10);
        index.insert_documents(&[doc("faq.md", &old)]).await.unwrap();
        let before = index.len().await.unwrap();

        // the first batch embeds, the second fails
        llm.fail_embeds_after(1);
        let new = "Install docker on linux first. ".repeat(10);
        let err = index.insert_documents(&[doc("faq.md", &new)]).await.unwrap_err();
        assert!(matches!(err, BotError::Llm(_)));

        assert_eq!(index.len().await.unwrap(), before);
        let stored = index
            .store
            .search(&keyword_embedding("ollama http"), before)
            .await
            .unwrap();
        assert_eq!(stored.len(), before);
        assert!(stored.iter().all(|r| r.chunk.content.contains("serves models")));
    }

    #[tokio::test]
    async fn index_is_reloaded_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let index = open_index(tmp.path(), 2).await;
            index
                .insert_documents(&[doc("a.md", "Ollama pulls models from a registry.")])
                .await
                .unwrap();
            index.close().await;
        }

        let reopened = open_index(tmp.path(), 2).await;
        assert_eq!(reopened.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn changing_embedding_model_clears_vectors() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let index = open_index(tmp.path(), 2).await;
            index
                .insert_documents(&[doc("a.md", "Some text.")])
                .await
                .unwrap();
            index.close().await;
        }

        let index = VectorIndex::open(
            tmp.path(),
            Arc::new(KeywordLlm::default()),
            "other-embed",
            RAGConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(index.len().await.unwrap(), 0);
    }
}
