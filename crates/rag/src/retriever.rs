//! Retriever construction
//!
//! Picks the configured backend and wires it behind the core `Retriever`
//! trait. Also hosts corpus ingestion for the Qdrant backend.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use agrow_config::{RetrievalBackend, RetrievalConfig};
use agrow_core::{rank_snippets, Result as CoreResult, Retriever, Snippet};
use async_trait::async_trait;

use crate::embeddings::{OllamaEmbedder, OllamaEmbeddingConfig};
use crate::keyword::KeywordRetriever;
use crate::knowledge_loader::KnowledgeLoader;
use crate::vector_store::{VectorStore, VectorStoreConfig};
use crate::RagError;

/// Dense retriever: embed the query, search Qdrant
pub struct QdrantRetriever {
    embedder: OllamaEmbedder,
    store: VectorStore,
    min_score: f32,
}

impl QdrantRetriever {
    pub fn new(embedder: OllamaEmbedder, store: VectorStore, min_score: f32) -> Self {
        Self {
            embedder,
            store,
            min_score,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Result<Self, RagError> {
        let (embedder, store) = dense_components(config, 0)?;
        Ok(Self::new(embedder, store, config.min_score))
    }
}

#[async_trait]
impl Retriever for QdrantRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> CoreResult<Vec<Snippet>> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.search(&embedding, k).await?;

        let snippets = hits
            .into_iter()
            .filter(|h| h.score >= self.min_score)
            .map(|h| Snippet::new(h.id, h.content, h.score))
            .collect();
        Ok(rank_snippets(snippets, k))
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

fn dense_components(
    config: &RetrievalConfig,
    vector_dim: usize,
) -> Result<(OllamaEmbedder, VectorStore), RagError> {
    let embedder = OllamaEmbedder::new(OllamaEmbeddingConfig {
        endpoint: config.embedding_endpoint.clone(),
        model: config.embedding_model.clone(),
        timeout: Duration::from_millis(config.timeout_ms),
    })?;
    let mut store_config = VectorStoreConfig {
        endpoint: config.qdrant_endpoint.clone(),
        collection: config.collection.clone(),
        ..Default::default()
    };
    if vector_dim > 0 {
        store_config.vector_dim = vector_dim;
    }
    Ok((embedder, VectorStore::new(store_config)?))
}

/// Build the configured retriever
pub fn create_retriever(config: &RetrievalConfig) -> Result<Arc<dyn Retriever>, RagError> {
    match config.backend {
        RetrievalBackend::Keyword => {
            let retriever =
                KeywordRetriever::from_path(Path::new(&config.corpus_path), config.min_score)?;
            tracing::info!(
                corpus = %config.corpus_path,
                documents = retriever.document_count(),
                "Keyword retriever ready"
            );
            Ok(Arc::new(retriever))
        }
        RetrievalBackend::Qdrant => {
            tracing::info!(
                endpoint = %config.qdrant_endpoint,
                collection = %config.collection,
                "Qdrant retriever ready"
            );
            Ok(Arc::new(QdrantRetriever::from_config(config)?))
        }
    }
}

/// Embed the corpus at `config.corpus_path` and upsert it into Qdrant.
///
/// Returns the number of documents indexed.
pub async fn index_corpus(config: &RetrievalConfig) -> Result<usize, RagError> {
    let documents = KnowledgeLoader::load(Path::new(&config.corpus_path))?;
    if documents.is_empty() {
        return Ok(0);
    }

    let (embedder, _) = dense_components(config, 0)?;
    let mut embeddings = Vec::with_capacity(documents.len());
    for doc in &documents {
        embeddings.push(embedder.embed(&doc.indexable_text()).await?);
    }

    let dim = embeddings.first().map(Vec::len).unwrap_or_default();
    if embeddings.iter().any(|e| e.len() != dim) {
        return Err(RagError::Index("Inconsistent embedding dimensions".to_string()));
    }

    let (_, store) = dense_components(config, dim)?;
    store.ensure_collection().await?;
    store.upsert(&documents, &embeddings).await?;

    tracing::info!(
        collection = %config.collection,
        documents = documents.len(),
        dim,
        "Indexed knowledge corpus"
    );
    Ok(documents.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn keyword_config(corpus: &Path) -> RetrievalConfig {
        RetrievalConfig {
            backend: RetrievalBackend::Keyword,
            corpus_path: corpus.display().to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_keyword_retriever() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("mustard.md"),
            "# Mustard aphids\nSpray neem oil when aphids colonise mustard shoots.",
        )
        .unwrap();

        let retriever = create_retriever(&keyword_config(dir.path())).unwrap();
        assert_eq!(retriever.name(), "keyword-bm25");

        let hits = retriever.retrieve("aphids on mustard", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "mustard");
    }

    #[tokio::test]
    async fn test_index_empty_corpus_is_noop() {
        let dir = tempdir().unwrap();
        let config = RetrievalConfig {
            backend: RetrievalBackend::Qdrant,
            corpus_path: dir.path().display().to_string(),
            ..Default::default()
        };
        assert_eq!(index_corpus(&config).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_qdrant_retriever_surfaces_embedding_failure() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = RetrievalConfig {
            backend: RetrievalBackend::Qdrant,
            embedding_endpoint: server.uri(),
            ..Default::default()
        };
        let retriever = QdrantRetriever::from_config(&config).unwrap();
        let err = retriever.retrieve("wheat", 3).await.unwrap_err();
        assert_eq!(err.kind(), "RetrievalUnavailable");
    }
}
