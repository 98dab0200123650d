use std::sync::Arc;

use tokio::sync::Mutex;

use crate::context::window::{estimate_tokens, MESSAGE_OVERHEAD_TOKENS};
use crate::context::ChatMemory;
use crate::core::errors::BotError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider, Role};
use crate::rag::{ContextBuilder, VectorIndex};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub chat_model: String,
    pub system_prompt: String,
    pub temperature: Option<f64>,
    pub num_ctx: Option<u64>,
    /// Character budget for retrieved context in the system prompt.
    pub max_context_chars: usize,
}

/// Retrieval plus conversation memory around a single conversation.
///
/// Each turn retrieves context for the incoming message, places it in the
/// system prompt, replays the token-windowed history and records both sides
/// of the exchange in memory.
pub struct ContextChatEngine {
    index: Arc<VectorIndex>,
    llm: Arc<dyn LlmProvider>,
    memory: Arc<dyn ChatMemory>,
    settings: EngineSettings,
    context: ContextBuilder,
    turn_lock: Mutex<()>,
}

impl ContextChatEngine {
    pub fn new(
        index: Arc<VectorIndex>,
        llm: Arc<dyn LlmProvider>,
        memory: Arc<dyn ChatMemory>,
        settings: EngineSettings,
    ) -> Self {
        let context = ContextBuilder::new(settings.max_context_chars);
        Self {
            index,
            llm,
            memory,
            settings,
            context,
            turn_lock: Mutex::new(()),
        }
    }

    pub fn memory(&self) -> &Arc<dyn ChatMemory> {
        &self.memory
    }

    /// Clears the conversation once any turn in flight has been recorded.
    pub async fn reset(&self) -> Result<(), BotError> {
        let _turn = self.turn_lock.lock().await;
        self.memory.clear().await
    }

    pub async fn chat(&self, message: &str) -> Result<String, BotError> {
        // one turn at a time per conversation keeps the transcript paired
        let _turn = self.turn_lock.lock().await;

        let retrieved = self.index.retrieve(message).await?;
        let system = self
            .context
            .system_message(&self.settings.system_prompt, &retrieved);

        self.memory.add_message(Role::User, message).await?;

        let reserved = estimate_tokens(&system) + MESSAGE_OVERHEAD_TOKENS;
        let history = self.memory.windowed_messages(reserved).await?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history);
        if !ends_with_message(&messages, message) {
            messages.push(ChatMessage::user(message));
        }

        let request = ChatRequest::new(messages)
            .with_temperature(self.settings.temperature)
            .with_num_ctx(self.settings.num_ctx);

        tracing::debug!(
            "Chat turn with {} retrieved chunks and {} messages",
            retrieved.len(),
            request.messages.len()
        );

        let reply = self.llm.chat(request, &self.settings.chat_model).await?;
        self.memory.add_message(Role::Assistant, &reply).await?;
        Ok(reply)
    }
}

fn ends_with_message(messages: &[ChatMessage], content: &str) -> bool {
    messages
        .last()
        .map(|m| m.role == Role::User && m.content == content)
        .unwrap_or(false)
}
