use serde::{Deserialize, Serialize};

use super::defaults::*;
use crate::rag::RAGConfig;

/// Typed view over `config.yml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub llm: LlmSettings,
    pub rag: RAGConfig,
    pub chat: ChatSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
    pub temperature: Option<f64>,
    /// Forwarded to Ollama as `num_ctx`.
    pub context_window: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_HOST.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            temperature: None,
            context_window: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub token_limit: usize,
    pub system_prompt: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            token_limit: DEFAULT_TOKEN_LIMIT,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of chat engines kept alive at once.
    pub capacity: u64,
    /// Engines untouched for this long are evicted.
    pub idle_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            idle_secs: DEFAULT_CACHE_IDLE_SECS,
        }
    }
}
