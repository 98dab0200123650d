use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use super::engine::{ContextChatEngine, EngineSettings};
use crate::context::DatabaseChatMemory;
use crate::core::config::BotConfig;
use crate::core::errors::BotError;
use crate::db::Database;
use crate::history::TranscriptStore;
use crate::llm::LlmProvider;
use crate::rag::{loader, VectorIndex};

/// Owns the shared retrieval index and one chat engine per conversation.
#[derive(Clone)]
pub struct RagChatPipeline {
    index: Arc<VectorIndex>,
    llm: Arc<dyn LlmProvider>,
    db: Database,
    transcripts: TranscriptStore,
    engine_settings: EngineSettings,
    token_limit: usize,
    engines: Cache<String, Arc<ContextChatEngine>>,
}

impl RagChatPipeline {
    /// Opens (or creates) the persisted index under `index_dir`.
    pub async fn open(
        db: Database,
        llm: Arc<dyn LlmProvider>,
        index_dir: impl AsRef<Path>,
        config: &BotConfig,
    ) -> Result<Self, BotError> {
        let index = VectorIndex::open(
            index_dir.as_ref(),
            llm.clone(),
            &config.llm.embedding_model,
            config.rag.clone(),
        )
        .await?;
        Ok(Self::with_index(db, llm, Arc::new(index), config))
    }

    pub fn with_index(
        db: Database,
        llm: Arc<dyn LlmProvider>,
        index: Arc<VectorIndex>,
        config: &BotConfig,
    ) -> Self {
        let (token_limit, num_ctx) = context_budget(config);
        let engine_settings = EngineSettings {
            chat_model: config.llm.chat_model.clone(),
            system_prompt: config.chat.system_prompt.clone(),
            temperature: config.llm.temperature,
            num_ctx: Some(num_ctx),
            // roughly half of the token budget, at ~4 characters per token
            max_context_chars: token_limit * 2,
        };
        let engines = Cache::builder()
            .max_capacity(config.cache.capacity)
            .time_to_idle(Duration::from_secs(config.cache.idle_secs))
            .build();

        Self {
            index,
            llm,
            transcripts: TranscriptStore::new(&db),
            db,
            engine_settings,
            token_limit,
            engines,
        }
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    pub async fn chat(&self, message: &str, conversation_id: &str) -> Result<String, BotError> {
        let engine = self.engine_for(conversation_id).await;
        engine.chat(message).await
    }

    /// Clears the stored conversation and drops its engine.
    pub async fn reset_chat(&self, conversation_id: &str) -> Result<(), BotError> {
        match self.engines.get(conversation_id).await {
            Some(engine) => engine.reset().await?,
            None => {
                self.transcripts.clear(conversation_id).await?;
            }
        }
        self.engines.invalidate(conversation_id).await;
        tracing::info!("Reset conversation {}", conversation_id);
        Ok(())
    }

    pub async fn load_local_directory(&self, path: impl AsRef<Path>) -> Result<usize, BotError> {
        let dir: PathBuf = path.as_ref().to_path_buf();
        let recursive = self.index.config().recursive;
        let documents = tokio::task::spawn_blocking(move || loader::load_directory(&dir, recursive))
            .await
            .map_err(BotError::internal)??;

        let inserted = self.index.insert_documents(&documents).await?;
        tracing::info!(
            "Indexed {} chunks from {} documents in {}",
            inserted,
            documents.len(),
            path.as_ref().display()
        );
        Ok(inserted)
    }

    pub async fn load_url(&self, url: &str) -> Result<usize, BotError> {
        let timeout = Duration::from_secs(self.index.config().web_timeout_secs);
        let document = loader::fetch_url(url, timeout).await?;
        let inserted = self.index.insert_documents(std::slice::from_ref(&document)).await?;
        tracing::info!("Indexed {} chunks from {}", inserted, url);
        Ok(inserted)
    }

    /// Releases the index and the relational store. Call once at shutdown.
    pub async fn close(&self) {
        self.engines.invalidate_all();
        self.index.close().await;
        self.db.close().await;
        tracing::info!("Pipeline closed");
    }

    pub async fn cached_engine(&self, conversation_id: &str) -> Option<Arc<ContextChatEngine>> {
        self.engines.get(conversation_id).await
    }

    async fn engine_for(&self, conversation_id: &str) -> Arc<ContextChatEngine> {
        self.engines
            .get_with(conversation_id.to_string(), async {
                tracing::debug!("Creating chat engine for {}", conversation_id);
                let memory = DatabaseChatMemory::new(
                    self.transcripts.clone(),
                    conversation_id,
                    self.token_limit,
                );
                Arc::new(ContextChatEngine::new(
                    self.index.clone(),
                    self.llm.clone(),
                    Arc::new(memory),
                    self.engine_settings.clone(),
                ))
            })
            .await
    }
}

/// History budget and the `num_ctx` sent with every request.
///
/// The model context defaults to the history budget; a smaller configured
/// context window caps the budget so nothing is cut off server side.
fn context_budget(config: &BotConfig) -> (usize, u64) {
    let token_limit = config.chat.token_limit;
    match config.llm.context_window {
        Some(window) => {
            let capped = usize::try_from(window).unwrap_or(usize::MAX).min(token_limit);
            (capped, window)
        }
        None => (token_limit, token_limit as u64),
    }
}
