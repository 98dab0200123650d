use async_trait::async_trait;

use super::types::{ChatRequest, ProviderModel};
use crate::core::errors::BotError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "ollama")
    fn name(&self) -> &str;

    /// list available models from the provider
    async fn list_models(&self) -> Result<Vec<ProviderModel>, BotError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, BotError>;

    /// generate embeddings, one vector per input
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, BotError>;
}

/// Wanted models that do not appear in `available`.
///
/// A name without a tag also matches its `:latest` variant, the way Ollama
/// resolves `mistral` to `mistral:latest`.
pub fn missing_models(available: &[ProviderModel], wanted: &[&str]) -> Vec<String> {
    wanted
        .iter()
        .filter(|name| {
            let latest = format!("{}:latest", name);
            !available.iter().any(|model| {
                [model.id.as_str(), model.name.as_str()]
                    .iter()
                    .any(|known| *known == **name || *known == latest)
            })
        })
        .map(|name| name.to_string())
        .collect()
}
