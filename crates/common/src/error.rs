use thiserror::Error;

/// Top-level error type for erpchat operations.
#[derive(Debug, Error)]
pub enum ErpChatError {
    // --- Hard dependency errors (chat cannot function) ---
    #[error("PostgreSQL error: {0}")]
    Postgres(String),

    #[error("LLM API error: {0}")]
    LlmApi(String),

    // --- Operational errors ---
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tool dispatch error: {0}")]
    Dispatch(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl ErpChatError {
    /// Whether this error is from a hard dependency (the service cannot answer).
    pub fn is_hard_dependency(&self) -> bool {
        matches!(self, Self::Postgres(_) | Self::LlmApi(_))
    }
}

/// Result type alias for erpchat operations.
pub type Result<T> = std::result::Result<T, ErpChatError>;
