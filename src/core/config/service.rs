use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::BotConfig;
use super::validation::validate_config;
use crate::core::errors::BotError;

const TOKEN_ENV: &str = "DISCORD_TOKEN";
const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    /// Loads `config.yml` (if any), validates it and applies env overrides.
    pub fn load_config(&self) -> Result<BotConfig, BotError> {
        let raw = load_yaml_file(&self.paths.config_path)?;
        let mut config = parse_config(raw)?;

        if let Ok(host) = env::var(OLLAMA_HOST_ENV) {
            if !host.trim().is_empty() {
                config.llm.base_url = normalize_host(&host);
            }
        }

        Ok(config)
    }

    /// The platform token is only ever read from the environment.
    pub fn discord_token(&self) -> Result<String, BotError> {
        match env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(BotError::Configuration(format!(
                "{} not found in environment variables or .env file",
                TOKEN_ENV
            ))),
        }
    }
}

pub fn parse_config(raw: Value) -> Result<BotConfig, BotError> {
    validate_config(&raw)?;
    let config: BotConfig =
        serde_json::from_value(raw).map_err(|e| BotError::Configuration(e.to_string()))?;

    if config.rag.chunk_overlap >= config.rag.chunk_size {
        return Err(BotError::Configuration(format!(
            "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
            config.rag.chunk_overlap, config.rag.chunk_size
        )));
    }

    Ok(config)
}

fn load_yaml_file(path: &Path) -> Result<Value, BotError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BotError::Configuration(format!("failed to read {}: {}", path.display(), e))
    })?;

    match serde_yaml::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(Value::Null) => Ok(Value::Object(Map::new())),
        Ok(_) => Err(BotError::Configuration(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
        Err(e) => Err(BotError::Configuration(format!(
            "failed to parse {}: {}",
            path.display(),
            e
        ))),
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
