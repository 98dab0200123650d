use serde_json::{Map, Value};

use crate::core::errors::BotError;

pub fn validate_config(config: &Value) -> Result<(), BotError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_non_empty_string_field(llm, "llm.base_url", "base_url")?;
        validate_non_empty_string_field(llm, "llm.chat_model", "chat_model")?;
        validate_non_empty_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            86_400,
        )?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.context_window", "context_window", 256, 10_000_000)?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 16, 100_000)?;
        validate_u64_field(rag, "rag.chunk_overlap", "chunk_overlap", 0, 10_000)?;
        validate_u64_field(rag, "rag.similarity_top_k", "similarity_top_k", 1, 100)?;
        validate_u64_field(rag, "rag.embed_batch_size", "embed_batch_size", 1, 1024)?;
        validate_u64_field(rag, "rag.web_timeout_secs", "web_timeout_secs", 1, 86_400)?;
        validate_bool_field(rag, "rag.recursive", "recursive")?;
    }

    if let Some(chat) = expect_optional_object(root, "chat")? {
        validate_u64_field(chat, "chat.token_limit", "token_limit", 256, 10_000_000)?;
        validate_non_empty_string_field(chat, "chat.system_prompt", "system_prompt")?;
    }

    if let Some(cache) = expect_optional_object(root, "cache")? {
        validate_u64_field(cache, "cache.capacity", "capacity", 1, 1_000_000)?;
        validate_u64_field(cache, "cache.idle_secs", "idle_secs", 1, 31_536_000)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, BotError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), BotError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), BotError> {
    // null means "not set" for the optional numeric settings
    let Some(value) = section.get(key).filter(|value| !value.is_null()) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), BotError> {
    // null means "not set" for the optional numeric settings
    let Some(value) = section.get(key).filter(|value| !value.is_null()) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), BotError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(BotError::Configuration(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn out_of_range<T: std::fmt::Display>(path: &str, min: T, max: T) -> BotError {
    BotError::Configuration(format!(
        "Invalid config at '{}': must be between {} and {}",
        path, min, max
    ))
}

fn config_type_error(path: &str, expected: &str) -> BotError {
    BotError::Configuration(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
