use std::sync::Arc;
use std::time::Duration;

use crate::bot::SupportDesk;
use crate::chat::RagChatPipeline;
use crate::core::config::{AppPaths, BotConfig, ConfigService};
use crate::db::Database;
use crate::llm::provider::missing_models;
use crate::llm::{LlmProvider, OllamaProvider};
use crate::tickets::TicketStore;

pub mod error;

use error::InitializationError;

/// Application-scoped handles shared by every event handler.
///
/// Contains:
/// - Paths and the loaded configuration
/// - The relational store (tickets, transcripts)
/// - The LLM provider and the RAG chat pipeline
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: BotConfig,
    pub database: Database,
    pub tickets: TicketStore,
    pub llm: Arc<dyn LlmProvider>,
    pub pipeline: RagChatPipeline,
}

impl AppState {
    /// Loads configuration, opens the database and the persisted index, and
    /// connects the Ollama provider.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config.load_config().map_err(InitializationError::Config)?;

        let llm = OllamaProvider::new(
            &settings.llm.base_url,
            Duration::from_secs(settings.llm.request_timeout_secs),
        )
        .map_err(InitializationError::Llm)?;

        tracing::info!("Using Ollama at {}", llm.base_url());
        Self::with_provider(paths, config, settings, Arc::new(llm)).await
    }

    /// Builds the state around an already constructed provider.
    pub async fn with_provider(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: BotConfig,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Arc<Self>, InitializationError> {
        check_models(llm.as_ref(), &settings).await;

        let database = Database::open(&paths.db_path)
            .await
            .map_err(InitializationError::Database)?;
        let tickets = TicketStore::new(&database);

        let pipeline = RagChatPipeline::open(database.clone(), llm.clone(), &paths.index_dir, &settings)
            .await
            .map_err(InitializationError::Index)?;

        Ok(Arc::new(AppState {
            paths,
            config,
            settings,
            database,
            tickets,
            llm,
            pipeline,
        }))
    }

    pub fn support_desk(&self) -> SupportDesk {
        SupportDesk::new(self.tickets.clone(), Arc::new(self.pipeline.clone()))
    }

    /// Releases the index and database. Call once, after the gateway stops.
    pub async fn shutdown(&self) {
        self.pipeline.close().await;
    }
}

/// Warns about configured models the provider does not serve. Startup goes on
/// either way; requests fail until the models are pulled.
async fn check_models(llm: &dyn LlmProvider, settings: &BotConfig) {
    match llm.list_models().await {
        Ok(models) => {
            let wanted = [
                settings.llm.chat_model.as_str(),
                settings.llm.embedding_model.as_str(),
            ];
            for model in missing_models(&models, &wanted) {
                tracing::warn!("Model {} is not available from {}", model, llm.name());
            }
        }
        Err(err) => tracing::warn!(
            "{} is not reachable yet; requests will fail until it is: {}",
            llm.name(),
            err
        ),
    }
}
