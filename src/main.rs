use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use docs_rag::config::PipelineConfig;
use docs_rag::database::{QdrantConfig, QdrantIndex};
use docs_rag::index::{InMemoryIndex, VectorIndex};
use docs_rag::indexer::{load_file, Indexer};
use docs_rag::openai::{OpenAiClient, OpenAiConfig};
use docs_rag::rag::RagEngine;
use docs_rag::server;
use docs_rag::store;
use docs_rag::tokens::{EstimatingCounter, TiktokenCounter, TokenCounter};

/// Question answering over a markdown documentation corpus, backed by OpenAI and Qdrant
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk and embed every markdown file below a directory, then load the vector index
    Index {
        /// Root directory of the documentation corpus
        root_dir: PathBuf,

        /// Directory receiving pages.json and embeddings.json
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Rebuild the vector index from a persisted embeddings.json
    Load {
        #[arg(default_value = store::EMBEDDINGS_FILE)]
        embeddings: PathBuf,
    },
    /// Serve the question answering HTTP endpoint
    Serve {
        #[arg(long, env = "RAG_BIND", default_value = "0.0.0.0:8000")]
        bind: String,
    },
    /// Answer a single question and print the result
    Ask {
        question: String,

        /// Answer from this embeddings.json held in memory instead of Qdrant
        #[arg(long)]
        local: Option<PathBuf>,

        /// Budget the context with the word and punctuation estimate instead of the model tokenizer
        #[arg(long)]
        estimate_tokens: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = PipelineConfig::from_env().context("Invalid RAG_* configuration")?;

    match args.command {
        Command::Index { root_dir, out_dir } => {
            let openai = Arc::new(openai_client()?);
            let indexer = Indexer::new(
                openai,
                qdrant_index(&config)?,
                config.chunker.clone(),
                config.upsert_batch,
            );

            let report = indexer
                .index_directory(&root_dir, &out_dir)
                .await
                .with_context(|| format!("Failed to index {}", root_dir.display()))?;
            info!(
                "Indexed {} documents into {} chunks ({} skipped, {} points failed to load)",
                report.documents_indexed,
                report.chunks_embedded,
                report.documents_skipped,
                report.points_failed
            );
        }
        Command::Load { embeddings } => {
            let index = qdrant_index(&config)?;
            let summary = load_file(index.as_ref(), &embeddings, config.upsert_batch)
                .await
                .with_context(|| format!("Failed to load {}", embeddings.display()))?;
            info!(
                "Loaded {} points into {} ({} failed)",
                summary.loaded, config.collection, summary.failed
            );
        }
        Command::Serve { bind } => {
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("Invalid bind address {}", bind))?;
            let engine = build_engine(&config, qdrant_index(&config)?, false)?;

            server::serve(Arc::new(engine), addr)
                .await
                .context("Server error")?;
        }
        Command::Ask {
            question,
            local,
            estimate_tokens,
        } => {
            let index: Arc<dyn VectorIndex> = match local {
                Some(path) => {
                    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryIndex::new());
                    load_file(index.as_ref(), &path, config.upsert_batch)
                        .await
                        .with_context(|| format!("Failed to load {}", path.display()))?;
                    index
                }
                None => qdrant_index(&config)?,
            };

            let engine = build_engine(&config, index, estimate_tokens)?;
            let answer = engine
                .answer(&question)
                .await
                .context("Failed to answer question")?;
            println!("{}", answer);
        }
    }

    Ok(())
}

fn openai_client() -> Result<OpenAiClient> {
    let openai_config = OpenAiConfig::from_env().context("Missing OPENAI_API_KEY")?;
    OpenAiClient::new(openai_config).context("Failed to initialize OpenAI client")
}

fn qdrant_index(config: &PipelineConfig) -> Result<Arc<dyn VectorIndex>> {
    let index = QdrantIndex::new(QdrantConfig::from_env(), config.collection.clone())
        .context("Failed to initialize Qdrant client")?;
    Ok(Arc::new(index))
}

fn build_engine(
    config: &PipelineConfig,
    index: Arc<dyn VectorIndex>,
    estimate_tokens: bool,
) -> Result<RagEngine> {
    let openai = Arc::new(openai_client()?);
    let counter: Arc<dyn TokenCounter> = if estimate_tokens {
        Arc::new(EstimatingCounter)
    } else {
        Arc::new(
            TiktokenCounter::for_model(&openai.config().chat_model)
                .context("Failed to load tokenizer")?,
        )
    };

    Ok(RagEngine::new(openai.clone(), index, openai, counter, config))
}
