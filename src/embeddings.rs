use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Converts text into a fixed-length vector through an embedding service
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text` exactly as given
    async fn embed_raw(&self, text: &str) -> Result<Embedding>;

    /// Embed `text` after newline normalization
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_raw(&normalize_input(text)).await
    }
}

/// Replace every line break with a single space
///
/// Embedding models score literal newlines differently from spaces.
pub fn normalize_input(text: &str) -> String {
    text.replace("\r\n", " ").replace('\n', " ")
}
