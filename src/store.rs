//! Persisted artifacts of the indexing job.
//!
//! `pages.json` holds one record per document and `embeddings.json` one record
//! per chunk with its vector, enough to rebuild the vector index without
//! calling the embedding service again.

use crate::chunking::Chunk;
use crate::document::Document;
use crate::error::{RagError, Result};
use crate::index::IndexPoint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub const PAGES_FILE: &str = "pages.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.json";

/// A document as persisted, keyed by `page_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_id: Option<String>,
    pub title: String,
    pub file_path: String,
    pub content: String,
}

impl From<&Document> for PageRecord {
    fn from(document: &Document) -> Self {
        PageRecord {
            page_id: document.page_id.clone(),
            title: document.title.clone(),
            file_path: document.source_path.display().to_string(),
            content: document.raw_content.clone(),
        }
    }
}

/// A chunk and its embedding, keyed by `embedding_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub embedding_id: String,
    pub page_id: Option<String>,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        EmbeddingRecord {
            embedding_id: chunk.chunk_id,
            page_id: chunk.page_id,
            content: chunk.text,
            embedding,
        }
    }

    pub fn into_point(self) -> IndexPoint {
        IndexPoint {
            chunk: Chunk {
                page_id: self.page_id,
                chunk_id: self.embedding_id,
                text: self.content,
            },
            vector: self.embedding,
        }
    }
}

/// Write records as a pretty-printed JSON array
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Shared dimension of all embeddings, `None` when there are no records
pub fn common_dimension(records: &[EmbeddingRecord]) -> Result<Option<usize>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };
    let dimension = first.embedding.len();

    if dimension == 0 {
        return Err(RagError::IndexService(format!(
            "embedding {} is empty",
            first.embedding_id
        )));
    }
    if let Some(odd) = records.iter().find(|r| r.embedding.len() != dimension) {
        return Err(RagError::IndexService(format!(
            "embedding {} has {} dimensions, expected {}",
            odd.embedding_id,
            odd.embedding.len(),
            dimension
        )));
    }

    Ok(Some(dimension))
}
