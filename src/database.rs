use crate::chunking::Chunk;
use crate::error::{RagError, Result};
use crate::index::{IndexPoint, Match, VectorIndex};
use async_trait::async_trait;
use log::{debug, info};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::json;
use std::collections::HashMap;
use std::env;

const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Configuration for Qdrant
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl QdrantConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Self {
        let url = env::var("QDRANT_URL").unwrap_or_else(|_| DEFAULT_QDRANT_URL.to_string());
        let api_key = env::var("QDRANT_API_KEY").ok();

        QdrantConfig { url, api_key }
    }
}

/// Qdrant collection holding chunk embeddings
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantIndex {
    /// Create a new Qdrant client bound to `collection`
    pub fn new(config: QdrantConfig, collection: impl Into<String>) -> Result<Self> {
        let config_builder = Qdrant::from_url(&config.url);
        let config_builder = if let Some(api_key) = config.api_key {
            config_builder.api_key(api_key)
        } else {
            config_builder
        };

        let client = config_builder
            .build()
            .map_err(|e| RagError::IndexService(format!("failed to create client: {}", e)))?;

        Ok(QdrantIndex {
            client,
            collection: collection.into(),
        })
    }

    /// Check if the collection exists
    pub async fn collection_exists(&self) -> Result<bool> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| index_error("check collection", &self.collection, e))
    }
}

fn index_error(action: &str, collection: &str, err: impl std::fmt::Display) -> RagError {
    RagError::IndexService(format!("failed to {} {}: {}", action, collection, err))
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn recreate(&self, dimension: usize) -> Result<()> {
        if self.collection_exists().await? {
            info!("Deleting existing collection {}", self.collection);
            self.client
                .delete_collection(self.collection.clone())
                .await
                .map_err(|e| index_error("delete collection", &self.collection, e))?;
        }

        // Scores are only meaningful if queries use the same metric
        let create_collection = CreateCollectionBuilder::new(self.collection.clone())
            .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Dot));

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| index_error("create collection", &self.collection, e))?;

        info!(
            "Created collection {} ({} dimensions, dot product)",
            self.collection, dimension
        );
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        let count = points.len();
        let points = points
            .into_iter()
            .map(|point| {
                let payload = to_payload(&point.chunk)?;
                Ok(PointStruct::new(point.chunk.chunk_id, point.vector, payload))
            })
            .collect::<Result<Vec<PointStruct>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
            .await
            .map_err(|e| index_error("upsert points in", &self.collection, e))?;

        debug!("Upserted {} points into {}", count, self.collection);
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<Match>> {
        let search_request =
            SearchPointsBuilder::new(self.collection.clone(), vector.to_vec(), limit as u64)
                .with_payload(true);

        let search_response = self
            .client
            .search_points(search_request)
            .await
            .map_err(|e| index_error("search", &self.collection, e))?;

        Ok(search_response
            .result
            .into_iter()
            .filter_map(|scored_point| {
                from_payload(scored_point.id, &scored_point.payload, scored_point.score)
            })
            .collect())
    }
}

/// Point payload: `{page_id, content}`
fn to_payload(chunk: &Chunk) -> Result<HashMap<String, Value>> {
    let payload = serde_json::from_value(json!({
        "page_id": chunk.page_id,
        "content": chunk.text,
    }))?;
    Ok(payload)
}

fn from_payload(id: Option<PointId>, payload: &HashMap<String, Value>, score: f32) -> Option<Match> {
    let text = payload.get("content")?.as_str()?.to_string();
    let page_id = payload
        .get("page_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let chunk_id = match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    };

    Some(Match {
        chunk: Chunk {
            page_id,
            chunk_id,
            text,
        },
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let chunk = Chunk {
            page_id: Some("page-1".to_string()),
            chunk_id: "4b0e0d9e-8d35-4d58-9d1e-5b0c1f0f7a11".to_string(),
            text: "## Reset\nUse Settings.".to_string(),
        };

        let payload = to_payload(&chunk).unwrap();
        let found = from_payload(Some(PointId::from(chunk.chunk_id.clone())), &payload, 0.9)
            .unwrap();

        assert_eq!(found.chunk, chunk);
        assert_eq!(found.score, 0.9);
    }

    #[test]
    fn test_payload_without_page_id() {
        let chunk = Chunk {
            page_id: None,
            chunk_id: "id".to_string(),
            text: "body".to_string(),
        };
        let payload = to_payload(&chunk).unwrap();
        let found = from_payload(None, &payload, 0.5).unwrap();

        assert_eq!(found.chunk.page_id, None);
        assert_eq!(found.chunk.text, "body");
    }

    #[test]
    fn test_payload_without_content_is_skipped() {
        assert!(from_payload(None, &HashMap::new(), 1.0).is_none());
    }
}
