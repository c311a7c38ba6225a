use crate::config::PipelineConfig;
use crate::context::ContextAssembler;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::prompt::{CompletionModel, PromptTemplate};
use crate::retrieval::Retriever;
use crate::tokens::TokenCounter;
use log::{debug, info};
use std::sync::Arc;

/// RAG (Retrieval-Augmented Generation) engine
///
/// Holds read-only handles to the external services, so one engine can serve
/// any number of concurrent queries.
#[derive(Clone)]
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    retriever: Retriever,
    assembler: ContextAssembler,
    completion: Arc<dyn CompletionModel>,
    prompt: PromptTemplate,
    temperature: f32,
}

impl RagEngine {
    /// Create a new RAG engine
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionModel>,
        counter: Arc<dyn TokenCounter>,
        config: &PipelineConfig,
    ) -> Self {
        RagEngine {
            embedder,
            retriever: Retriever::new(index, config.top_k, config.score_floor),
            assembler: ContextAssembler::new(counter, config.max_tokens, config.delimiter.clone()),
            completion,
            prompt: PromptTemplate::new(config.product_name.clone()),
            temperature: config.temperature,
        }
    }

    /// Embed the query, retrieve matches and pack them into a context string
    pub async fn build_context(&self, query: &str) -> Result<String> {
        let query_embedding = self.embedder.embed(query).await?;
        let matches = self.retriever.retrieve(&query_embedding).await?;
        Ok(self.assembler.assemble(&matches))
    }

    /// Answer a question from the indexed documentation
    pub async fn answer(&self, query: &str) -> Result<String> {
        let query = query.trim();
        let context = self.build_context(query).await?;

        if context.is_empty() {
            info!("No documentation matched query {:?}", query);
        } else {
            debug!("Context for {:?}: {} bytes", query, context.len());
        }

        let messages = self.prompt.build_messages(&context, query);
        self.completion.complete(&messages, self.temperature).await
    }
}
