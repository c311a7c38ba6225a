use crate::chunking::Chunk;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::RwLock;

/// A chunk vector ready for the index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPoint {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A retrieved chunk and its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub chunk: Chunk,
    pub score: f32,
}

/// Nearest-neighbour search over chunk embeddings, scored by dot product
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Drop any existing collection and create an empty one for `dimension`-sized vectors
    async fn recreate(&self, dimension: usize) -> Result<()>;

    /// Insert or replace points
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()>;

    /// Up to `limit` points ranked by descending score
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<Match>>;
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Brute-force index held in memory
#[derive(Default)]
pub struct InMemoryIndex {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    dimension: Option<usize>,
    points: Vec<IndexPoint>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.points.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> RagError {
    RagError::IndexService("in-memory index lock poisoned".to_string())
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn recreate(&self, dimension: usize) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.dimension = Some(dimension);
        state.points.clear();
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;

        for point in points {
            let dimension = *state.dimension.get_or_insert(point.vector.len());
            if point.vector.len() != dimension {
                return Err(RagError::IndexService(format!(
                    "vector for {} has {} dimensions, collection expects {}",
                    point.chunk.chunk_id,
                    point.vector.len(),
                    dimension
                )));
            }

            match state
                .points
                .iter()
                .position(|existing| existing.chunk.chunk_id == point.chunk.chunk_id)
            {
                Some(position) => state.points[position] = point,
                None => state.points.push(point),
            }
        }

        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<Match>> {
        let state = self.state.read().map_err(poisoned)?;

        if let Some(dimension) = state.dimension {
            if vector.len() != dimension {
                return Err(RagError::IndexService(format!(
                    "query has {} dimensions, collection expects {}",
                    vector.len(),
                    dimension
                )));
            }
        }

        let mut matches: Vec<Match> = state
            .points
            .iter()
            .map(|point| Match {
                chunk: point.chunk.clone(),
                score: dot_product(vector, &point.vector),
            })
            .collect();

        // Stable sort keeps insertion order for equal scores
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches.truncate(limit);

        Ok(matches)
    }
}
