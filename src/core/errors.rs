use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("llm error: {0}")]
    Llm(String),
    #[error("platform error: {0}")]
    Platform(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl BotError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        BotError::Internal(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        BotError::Storage(err.to_string())
    }

    pub fn llm<E: std::fmt::Display>(err: E) -> Self {
        BotError::Llm(err.to_string())
    }

    /// Whether the error came from the relational or vector store.
    pub fn is_storage(&self) -> bool {
        matches!(self, BotError::Storage(_) | BotError::Conflict(_))
    }
}

impl From<sqlx::Error> for BotError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return BotError::Conflict(db_err.message().to_string());
            }
        }
        BotError::storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_classified() {
        assert!(BotError::storage("disk full").is_storage());
        assert!(BotError::Conflict("dup".into()).is_storage());
        assert!(!BotError::llm("timeout").is_storage());
    }

    #[test]
    fn non_database_sqlx_errors_map_to_storage() {
        let err: BotError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, BotError::Storage(_)));
    }
}
