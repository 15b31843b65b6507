//! Vector Store using Qdrant
//!
//! Dense vector storage and similarity search. Point ids are the document's
//! position in the sorted corpus; the corpus id travels in the payload.

use qdrant_client::{
    qdrant::{
        value::Kind, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
        UpsertPointsBuilder, Value, VectorParamsBuilder,
    },
    Qdrant,
};
use std::collections::HashMap;

use agrow_config::constants::endpoints;

use crate::knowledge_loader::KnowledgeDocument;
use crate::RagError;

const PAYLOAD_DOC_ID: &str = "doc_id";
const PAYLOAD_TEXT: &str = "text";

/// Vector store configuration
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub endpoint: String,
    pub collection: String,
    /// Set when the collection is created; must match the embedder
    pub vector_dim: usize,
    pub api_key: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::QDRANT_DEFAULT.to_string(),
            collection: "agrow_knowledge".to_string(),
            vector_dim: 768,
            api_key: std::env::var("QDRANT_API_KEY").ok(),
        }
    }
}

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// Corpus document id
    pub id: String,
    pub score: f32,
    pub content: String,
}

/// Vector store client
pub struct VectorStore {
    client: Qdrant,
    config: VectorStoreConfig,
}

impl VectorStore {
    pub fn new(config: VectorStoreConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&config.endpoint);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }

        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Create collection if not exists
    pub async fn ensure_collection(&self) -> Result<(), RagError> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        if !exists {
            tracing::info!(
                collection = %self.config.collection,
                dim = self.config.vector_dim,
                "Creating Qdrant collection"
            );
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection).vectors_config(
                        VectorParamsBuilder::new(self.config.vector_dim as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;
        }

        Ok(())
    }

    /// Insert documents with their embeddings
    pub async fn upsert(
        &self,
        documents: &[KnowledgeDocument],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        if documents.len() != embeddings.len() {
            return Err(RagError::VectorStore(
                "Document and embedding count mismatch".to_string(),
            ));
        }

        let points: Vec<PointStruct> = documents
            .iter()
            .zip(embeddings.iter())
            .enumerate()
            .map(|(i, (doc, emb))| {
                let mut payload: HashMap<String, Value> = HashMap::new();
                payload.insert(PAYLOAD_DOC_ID.to_string(), doc.id.clone().into());
                payload.insert(PAYLOAD_TEXT.to_string(), doc.content.clone().into());
                payload.insert("language".to_string(), doc.language.clone().into());
                if let Some(ref category) = doc.category {
                    payload.insert("category".to_string(), category.clone().into());
                }
                PointStruct::new(i as u64, emb.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, points).wait(true))
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(())
    }

    /// Search by vector
    pub async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorSearchResult>, RagError> {
        let request = SearchPointsBuilder::new(
            &self.config.collection,
            query_embedding.to_vec(),
            top_k as u64,
        )
        .with_payload(true);

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                let mut id = None;
                let mut content = None;
                for (k, v) in point.payload {
                    if let Some(Kind::StringValue(s)) = v.kind {
                        match k.as_str() {
                            PAYLOAD_DOC_ID => id = Some(s),
                            PAYLOAD_TEXT => content = Some(s),
                            _ => {}
                        }
                    }
                }
                Some(VectorSearchResult {
                    id: id?,
                    score: point.score,
                    content: content?,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = VectorStoreConfig::default();
        assert_eq!(config.collection, "agrow_knowledge");
        assert_eq!(config.endpoint, endpoints::QDRANT_DEFAULT);
    }

    #[test]
    fn test_new_does_not_connect() {
        let store = VectorStore::new(VectorStoreConfig::default()).unwrap();
        assert_eq!(store.collection(), "agrow_knowledge");
    }
}
