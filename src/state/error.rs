use thiserror::Error;

use crate::core::errors::BotError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] BotError),

    #[error("Failed to open database: {0}")]
    Database(#[source] BotError),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] BotError),

    #[error("Failed to open retrieval index: {0}")]
    Index(#[source] BotError),
}
