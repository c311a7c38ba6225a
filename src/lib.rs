pub mod chunking;
pub mod config;
pub mod context;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod indexer;
pub mod openai;
pub mod prompt;
pub mod rag;
pub mod retrieval;
pub mod server;
pub mod store;
pub mod tokens;
