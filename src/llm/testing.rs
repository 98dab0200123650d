//! Deterministic provider for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::provider::LlmProvider;
use super::types::{ChatRequest, ProviderModel, Role};
use crate::core::errors::BotError;

const VOCABULARY: [&str; 12] = [
    "install", "gpu", "cuda", "model", "ollama", "linux", "windows", "docker", "api", "http",
    "registry", "pull",
];

/// Embeds text as keyword counts and answers chats with `echo: <last user message>`.
#[derive(Default)]
pub struct KeywordLlm {
    pub requests: Mutex<Vec<ChatRequest>>,
    pub chat_calls: AtomicUsize,
    pub fail_chat: AtomicBool,
    /// Embed calls left before every further call fails; `None` never fails.
    pub embed_budget: Mutex<Option<usize>>,
}

impl KeywordLlm {
    pub fn failing() -> Self {
        let llm = Self::default();
        llm.fail_chat.store(true, Ordering::SeqCst);
        llm
    }

    pub fn fail_embeds_after(&self, calls: usize) {
        *self.embed_budget.lock().unwrap() = Some(calls);
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

pub fn keyword_embedding(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .map(|word| lower.matches(word).count() as f32)
        .collect()
}

#[async_trait]
impl LlmProvider for KeywordLlm {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, BotError> {
        Ok(Vec::new())
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, BotError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);

        if self.fail_chat.load(Ordering::SeqCst) {
            return Err(BotError::Llm("model crashed".to_string()));
        }
        Ok(format!("echo: {}", last_user))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, BotError> {
        if let Some(remaining) = self.embed_budget.lock().unwrap().as_mut() {
            if *remaining == 0 {
                return Err(BotError::Llm("embedding model unloaded".to_string()));
            }
            *remaining -= 1;
        }
        Ok(inputs.iter().map(|text| keyword_embedding(text)).collect())
    }
}
