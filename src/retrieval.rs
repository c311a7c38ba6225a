use crate::embeddings::Embedding;
use crate::error::Result;
use crate::index::{Match, VectorIndex};
use log::debug;
use std::cmp::Ordering;
use std::sync::Arc;

/// Fetches the best-scoring chunks for a query vector
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    score_floor: f32,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, top_k: usize, score_floor: f32) -> Self {
        Retriever {
            index,
            top_k,
            score_floor,
        }
    }

    /// At most `top_k` matches scoring above the floor, best first
    ///
    /// An empty result is a normal outcome, not an error.
    pub async fn retrieve(&self, query: &Embedding) -> Result<Vec<Match>> {
        let candidates = self.index.search(&query.values, self.top_k).await?;
        let candidate_count = candidates.len();
        let matches = rank_matches(candidates, self.top_k, self.score_floor);

        debug!(
            "{} of {} candidates scored above {}",
            matches.len(),
            candidate_count,
            self.score_floor
        );
        Ok(matches)
    }
}

/// Keep matches strictly above `score_floor`, order by descending score, cap at `top_k`
pub fn rank_matches(mut matches: Vec<Match>, top_k: usize, score_floor: f32) -> Vec<Match> {
    matches.retain(|m| m.score > score_floor);
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches.truncate(top_k);
    matches
}
