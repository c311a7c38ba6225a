use crate::chunking::ChunkerConfig;
use crate::document::{discover_markdown, Document};
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::store::{self, EmbeddingRecord, PageRecord, EMBEDDINGS_FILE, PAGES_FILE};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// Counts from one indexing run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub chunks_embedded: usize,
    /// Points whose upsert batch was rejected by the index
    pub points_failed: usize,
}

/// Outcome of one bulk load
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub failed: usize,
}

/// Output of processing a corpus, before it is persisted or loaded
#[derive(Debug, Default)]
pub struct ProcessedCorpus {
    pub pages: Vec<PageRecord>,
    pub embeddings: Vec<EmbeddingRecord>,
    pub report: IndexReport,
}

/// Offline path: chunk, embed, persist and bulk-load a documentation corpus
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunker: ChunkerConfig,
    upsert_batch: usize,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chunker: ChunkerConfig,
        upsert_batch: usize,
    ) -> Self {
        Indexer {
            embedder,
            index,
            chunker,
            upsert_batch: upsert_batch.max(1),
        }
    }

    /// Chunk and embed every markdown file below `root`
    ///
    /// A document that cannot be read, parsed or embedded is logged and
    /// skipped; the rest of the corpus is still processed.
    pub async fn process_directory(&self, root: &Path) -> Result<ProcessedCorpus> {
        let mut corpus = ProcessedCorpus::default();

        for file_path in discover_markdown(root)? {
            info!("Processing {}", file_path.display());

            match self.process_file(&file_path).await {
                Ok((page, embeddings)) => {
                    corpus.report.documents_indexed += 1;
                    corpus.report.chunks_embedded += embeddings.len();
                    corpus.pages.push(page);
                    corpus.embeddings.extend(embeddings);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file_path.display(), e);
                    corpus.report.documents_skipped += 1;
                }
            }
        }

        info!(
            "Generated {} embeddings from {} pages ({} skipped)",
            corpus.report.chunks_embedded,
            corpus.report.documents_indexed,
            corpus.report.documents_skipped
        );
        Ok(corpus)
    }

    async fn process_file(&self, file_path: &Path) -> Result<(PageRecord, Vec<EmbeddingRecord>)> {
        let (document, chunks) = Document::from_file(file_path, &self.chunker)?;

        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = self.embedder.embed(&chunk.text).await?;
            embeddings.push(EmbeddingRecord::new(chunk, embedding.values));
        }

        Ok((PageRecord::from(&document), embeddings))
    }

    /// Process `root`, write `pages.json` and `embeddings.json` to `out_dir`, then load the index
    pub async fn index_directory(&self, root: &Path, out_dir: &Path) -> Result<IndexReport> {
        let corpus = self.process_directory(root).await?;

        store::write_records(&out_dir.join(PAGES_FILE), &corpus.pages)?;
        store::write_records(&out_dir.join(EMBEDDINGS_FILE), &corpus.embeddings)?;
        info!("Wrote {} and {} to {}", PAGES_FILE, EMBEDDINGS_FILE, out_dir.display());

        let summary = bulk_load(self.index.as_ref(), corpus.embeddings, self.upsert_batch).await?;
        let mut report = corpus.report;
        report.points_failed = summary.failed;
        Ok(report)
    }
}

/// Rebuild `index` from a persisted `embeddings.json`, without the embedding service
pub async fn load_file(
    index: &dyn VectorIndex,
    embeddings_path: &Path,
    batch_size: usize,
) -> Result<LoadSummary> {
    let records: Vec<EmbeddingRecord> = store::read_records(embeddings_path)?;
    bulk_load(index, records, batch_size).await
}

/// Recreate the collection and upsert `records` in batches
///
/// A rejected batch is logged and counted, and the remaining batches are still
/// upserted. Failing to recreate the collection aborts the load. An empty record
/// set leaves the index untouched.
pub async fn bulk_load(
    index: &dyn VectorIndex,
    records: Vec<EmbeddingRecord>,
    batch_size: usize,
) -> Result<LoadSummary> {
    let Some(dimension) = store::common_dimension(&records)? else {
        warn!("No embeddings to load");
        return Ok(LoadSummary::default());
    };

    index.recreate(dimension).await?;

    let mut summary = LoadSummary::default();
    let mut points = records.into_iter().map(EmbeddingRecord::into_point).peekable();
    while points.peek().is_some() {
        let batch: Vec<_> = points.by_ref().take(batch_size.max(1)).collect();
        let size = batch.len();
        match index.upsert(batch).await {
            Ok(()) => summary.loaded += size,
            Err(e) => {
                warn!("Skipping batch of {} points: {}", size, e);
                summary.failed += size;
            }
        }
    }

    info!("Loaded {} points ({} failed)", summary.loaded, summary.failed);
    Ok(summary)
}
