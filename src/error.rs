use thiserror::Error;

/// Errors produced by the indexing and query pipelines
#[derive(Debug, Error)]
pub enum RagError {
    /// Document metadata header is missing or malformed
    #[error("failed to parse document: {0}")]
    Parse(String),

    /// Embedding request failed
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// Vector search or upsert failed
    #[error("vector index error: {0}")]
    IndexService(String),

    /// Chat completion request failed
    #[error("completion service error: {0}")]
    CompletionService(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Whether the error came from one of the external services
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingService(_)
                | RagError::IndexService(_)
                | RagError::CompletionService(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
