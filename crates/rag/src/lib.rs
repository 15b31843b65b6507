//! Context retrieval for the helpline
//!
//! Features:
//! - Deterministic in-memory BM25 keyword index (tantivy) over a local corpus
//! - Dense vector search via Qdrant with Ollama embeddings
//! - Knowledge loading from YAML/JSON/plain-text files
//! - Core `Retriever` trait implementations for both backends

pub mod embeddings;
pub mod keyword;
pub mod knowledge_loader;
pub mod retriever;
pub mod vector_store;

pub use embeddings::{OllamaEmbedder, OllamaEmbeddingConfig};
pub use keyword::{KeywordIndex, KeywordRetriever};
pub use knowledge_loader::{KnowledgeDocument, KnowledgeFile, KnowledgeLoader};
pub use retriever::{create_retriever, index_corpus, QdrantRetriever};
pub use vector_store::{VectorSearchResult, VectorStore, VectorStoreConfig};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<RagError> for agrow_core::Error {
    fn from(err: RagError) -> Self {
        agrow_core::Error::RetrievalUnavailable(err.to_string())
    }
}
