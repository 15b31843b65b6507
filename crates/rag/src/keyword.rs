//! Keyword search using Tantivy (BM25)
//!
//! In-memory sparse index over the knowledge corpus. Text, title and
//! category are analyzed with `SimpleTokenizer`, which splits on Unicode
//! alphanumerics, so Devanagari and other Indic scripts index the same way
//! Latin text does. English terms are additionally stemmed.

use std::path::Path;

use agrow_core::{rank_snippets, Result as CoreResult, Retriever, Snippet};
use async_trait::async_trait;
use tantivy::{
    collector::TopDocs,
    query::QueryParser,
    schema::{
        Field, IndexRecordOption, OwnedValue, Schema, TextFieldIndexing, TextOptions, STORED,
        STRING,
    },
    tokenizer::{Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer},
    Index, IndexReader, TantivyDocument,
};

use crate::knowledge_loader::{KnowledgeDocument, KnowledgeLoader};
use crate::RagError;

const TOKENIZER: &str = "agrow_multilingual";

/// Indexing heap for a single writer thread
const WRITER_HEAP_BYTES: usize = 20_000_000;

/// Sparse BM25 index
pub struct KeywordIndex {
    index: Index,
    reader: IndexReader,
    id_field: Field,
    text_field: Field,
    title_field: Field,
    category_field: Field,
    len: usize,
}

impl KeywordIndex {
    pub fn build(documents: Vec<KnowledgeDocument>) -> Result<Self, RagError> {
        let mut schema_builder = Schema::builder();

        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(TOKENIZER)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let id_field = schema_builder.add_text_field("id", STRING | STORED);
        let text_field = schema_builder.add_text_field("text", text_options.clone());
        let title_field = schema_builder.add_text_field("title", text_options.clone());
        let category_field = schema_builder.add_text_field("category", text_options);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        index.tokenizers().register(TOKENIZER, Self::build_tokenizer());

        // One thread keeps every document in a single segment
        let mut writer = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(|e| RagError::Index(e.to_string()))?;

        let len = documents.len();
        for doc in documents {
            let mut tantivy_doc = TantivyDocument::default();
            tantivy_doc.add_text(id_field, &doc.id);
            tantivy_doc.add_text(text_field, &doc.content);

            let mut title = doc.title;
            if !doc.keywords.is_empty() {
                title.push(' ');
                title.push_str(&doc.keywords.join(" "));
            }
            if !title.trim().is_empty() {
                tantivy_doc.add_text(title_field, title.trim());
            }
            if let Some(ref category) = doc.category {
                tantivy_doc.add_text(category_field, category);
            }

            writer
                .add_document(tantivy_doc)
                .map_err(|e| RagError::Index(e.to_string()))?;
        }

        writer
            .commit()
            .map_err(|e| RagError::Index(e.to_string()))?;

        let reader = index.reader().map_err(|e| RagError::Index(e.to_string()))?;
        reader
            .reload()
            .map_err(|e| RagError::Index(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            id_field,
            text_field,
            title_field,
            category_field,
            len,
        })
    }

    fn build_tokenizer() -> TextAnalyzer {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(100))
            .filter(LowerCaser)
            .filter(Stemmer::new(Language::English))
            .build()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Score every document against `query`.
    ///
    /// Scores are normalized to `0.0..=1.0` by the best match. Documents
    /// sharing no term with the query are omitted.
    pub fn search(&self, query: &str) -> Result<Vec<Snippet>, RagError> {
        if self.is_empty() || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(
            &self.index,
            vec![self.text_field, self.title_field, self.category_field],
        );
        // Caller speech is not query syntax; stray quotes or colons are dropped
        let (query, _ignored) = query_parser.parse_query_lenient(query);

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(self.len))
            .map_err(|e| RagError::Search(e.to_string()))?;

        let max = top_docs.iter().map(|(s, _)| *s).fold(0.0_f32, f32::max);
        if max <= 0.0 {
            return Ok(Vec::new());
        }

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| RagError::Search(e.to_string()))?;

            let id = match doc.get_first(self.id_field) {
                Some(OwnedValue::Str(s)) => s.to_string(),
                _ => continue,
            };
            let content = match doc.get_first(self.text_field) {
                Some(OwnedValue::Str(s)) => s.to_string(),
                _ => String::new(),
            };
            hits.push(Snippet::new(id, content, score / max));
        }

        Ok(hits)
    }
}

/// Retriever backed by a [`KeywordIndex`]
pub struct KeywordRetriever {
    index: KeywordIndex,
    min_score: f32,
}

impl KeywordRetriever {
    pub fn new(index: KeywordIndex, min_score: f32) -> Self {
        Self { index, min_score }
    }

    /// Load the corpus at `path` and index it
    pub fn from_path(path: &Path, min_score: f32) -> Result<Self, RagError> {
        let documents = KnowledgeLoader::load(path)?;
        if documents.is_empty() {
            tracing::warn!(path = %path.display(), "Keyword index is empty; retrieval will return no context");
        }
        Ok(Self::new(KeywordIndex::build(documents)?, min_score))
    }

    pub fn document_count(&self) -> usize {
        self.index.len()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> CoreResult<Vec<Snippet>> {
        let hits: Vec<Snippet> = self
            .index
            .search(query)?
            .into_iter()
            .filter(|s| s.score >= self.min_score)
            .collect();
        Ok(rank_snippets(hits, k))
    }

    fn name(&self) -> &str {
        "keyword-bm25"
    }
}
