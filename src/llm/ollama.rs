use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::provider::LlmProvider;
use super::types::{ChatRequest, ProviderModel};
use crate::core::errors::BotError;

#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BotError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BotError::llm)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagInfo>,
}

#[derive(Deserialize)]
struct TagInfo {
    name: String,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, BotError> {
        let url = format!("{}/api/tags", self.base_url);
        let res = self.client.get(&url).send().await.map_err(BotError::llm)?;

        if !res.status().is_success() {
            return Err(BotError::Llm(format!("Failed to list models: {}", res.status())));
        }

        let response: TagsResponse = res.json().await.map_err(BotError::llm)?;
        Ok(response
            .models
            .into_iter()
            .map(|m| ProviderModel {
                id: m.model.unwrap_or_else(|| m.name.clone()),
                name: m.name,
            })
            .collect())
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, BotError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut options = Map::new();
        if let Some(t) = request.temperature {
            options.insert("temperature".to_string(), json!(t));
        }
        if let Some(n) = request.num_ctx {
            options.insert("num_ctx".to_string(), json!(n));
        }

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(BotError::llm)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(BotError::Llm(format!("Ollama chat error ({}): {}", status, text)));
        }

        let payload: ChatResponse = res.json().await.map_err(BotError::llm)?;
        Ok(payload.message.content)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, BotError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(BotError::llm)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(BotError::Llm(format!("Ollama embed error ({}): {}", status, text)));
        }

        let payload: EmbedResponse = res.json().await.map_err(BotError::llm)?;
        if payload.embeddings.len() != inputs.len() {
            return Err(BotError::Llm(format!(
                "Ollama returned {} embeddings for {} inputs",
                payload.embeddings.len(),
                inputs.len()
            )));
        }

        Ok(payload.embeddings)
    }
}
