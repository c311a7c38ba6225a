use crate::chunking::ChunkerConfig;
use crate::error::{RagError, Result};
use std::env;
use std::str::FromStr;

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_SCORE_FLOOR: f32 = 0.78;
pub const DEFAULT_MAX_TOKENS: usize = 1500;
pub const DEFAULT_DELIMITER: &str = "\n---\n";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_COLLECTION: &str = "doc-embeddings";
pub const DEFAULT_PRODUCT_NAME: &str = "Postman";
pub const DEFAULT_UPSERT_BATCH: usize = 64;

/// Tunables for the indexing and query pipelines
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunker: ChunkerConfig,
    /// Number of neighbours requested from the vector index
    pub top_k: usize,
    /// Matches must score strictly above this value
    pub score_floor: f32,
    /// Token budget for the assembled context
    pub max_tokens: usize,
    /// Appended after every chunk in the context
    pub delimiter: String,
    pub temperature: f32,
    pub collection: String,
    /// Product named in the prompt ("Here is the documentation for ...")
    pub product_name: String,
    pub upsert_batch: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            chunker: ChunkerConfig::default(),
            top_k: DEFAULT_TOP_K,
            score_floor: DEFAULT_SCORE_FLOOR,
            max_tokens: DEFAULT_MAX_TOKENS,
            delimiter: DEFAULT_DELIMITER.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            collection: DEFAULT_COLLECTION.to_string(),
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            upsert_batch: DEFAULT_UPSERT_BATCH,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration from defaults overridden by `RAG_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create a configuration reading overrides through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = PipelineConfig::default();

        if let Some(value) = lookup("RAG_TOP_K") {
            config.top_k = parse_value("RAG_TOP_K", &value)?;
        }
        if let Some(value) = lookup("RAG_SCORE_FLOOR") {
            config.score_floor = parse_value("RAG_SCORE_FLOOR", &value)?;
        }
        if let Some(value) = lookup("RAG_MAX_TOKENS") {
            config.max_tokens = parse_value("RAG_MAX_TOKENS", &value)?;
        }
        if let Some(value) = lookup("RAG_TEMPERATURE") {
            config.temperature = parse_value("RAG_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("RAG_UPSERT_BATCH") {
            config.upsert_batch = parse_value("RAG_UPSERT_BATCH", &value)?;
        }
        if let Some(value) = lookup("RAG_HEADING_MARKER") {
            if value.is_empty() {
                return Err(RagError::Config(
                    "RAG_HEADING_MARKER must not be empty".to_string(),
                ));
            }
            config.chunker.heading_marker = value;
        }
        if let Some(value) = lookup("RAG_EXCLUDED_HEADINGS") {
            config.chunker.excluded_headings = value
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();
        }
        if let Some(value) = lookup("RAG_COLLECTION") {
            config.collection = value;
        }
        if let Some(value) = lookup("RAG_PRODUCT_NAME") {
            config.product_name = value;
        }

        if config.top_k == 0 {
            return Err(RagError::Config("RAG_TOP_K must be at least 1".to_string()));
        }
        if config.upsert_batch == 0 {
            return Err(RagError::Config(
                "RAG_UPSERT_BATCH must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RagError::Config(format!("{} has invalid value {:?}", key, value)))
}
