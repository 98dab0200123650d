use async_trait::async_trait;

use super::window::TokenWindow;
use crate::core::errors::BotError;
use crate::history::TranscriptStore;
use crate::llm::types::{ChatMessage, Role};

/// Conversation memory as seen by a chat engine.
#[async_trait]
pub trait ChatMemory: Send + Sync {
    async fn add_message(&self, role: Role, content: &str) -> Result<(), BotError>;

    /// Whole history, oldest first.
    async fn get_messages(&self) -> Result<Vec<ChatMessage>, BotError>;

    async fn clear(&self) -> Result<(), BotError>;

    fn token_limit(&self) -> usize;

    /// Newest part of the history that fits `token_limit - reserved_tokens`.
    async fn windowed_messages(&self, reserved_tokens: usize) -> Result<Vec<ChatMessage>, BotError> {
        let messages = self.get_messages().await?;
        Ok(TokenWindow::new(self.token_limit()).fit(messages, reserved_tokens))
    }
}

/// `ChatMemory` backed by the shared transcript table, scoped to one channel.
#[derive(Debug, Clone)]
pub struct DatabaseChatMemory {
    store: TranscriptStore,
    channel_id: String,
    token_limit: usize,
}

impl DatabaseChatMemory {
    pub fn new(store: TranscriptStore, channel_id: impl Into<String>, token_limit: usize) -> Self {
        Self {
            store,
            channel_id: channel_id.into(),
            token_limit,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

#[async_trait]
impl ChatMemory for DatabaseChatMemory {
    async fn add_message(&self, role: Role, content: &str) -> Result<(), BotError> {
        self.store.append(&self.channel_id, role, content).await
    }

    async fn get_messages(&self) -> Result<Vec<ChatMessage>, BotError> {
        let history = self.store.history(&self.channel_id).await?;
        Ok(history.into_iter().map(ChatMessage::from).collect())
    }

    async fn clear(&self) -> Result<(), BotError> {
        let removed = self.store.clear(&self.channel_id).await?;
        tracing::debug!("Cleared {} messages from {}", removed, self.channel_id);
        Ok(())
    }

    fn token_limit(&self) -> usize {
        self.token_limit
    }
}
