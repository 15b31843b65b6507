//! Knowledge Base Loader
//!
//! Reads the advisory corpus from disk. A corpus path may be a directory or
//! a single file. Supported entries:
//! - `.yaml`/`.yml`/`.json` files holding a `documents` array (a bare JSON
//!   array of documents is accepted too)
//! - `.txt`/`.md` files, one document per file, id taken from the file stem

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::RagError;

/// Knowledge document format for YAML/JSON files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeDocument {
    /// Unique document ID
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Document content (indexed and returned as the snippet text)
    pub content: String,
    /// Category (e.g. "pest", "soil", "scheme")
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Extra terms indexed alongside the content
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

impl KnowledgeDocument {
    /// Text that gets indexed: title, keywords and content
    pub fn indexable_text(&self) -> String {
        let mut text = String::with_capacity(self.content.len() + self.title.len() + 32);
        if !self.title.is_empty() {
            text.push_str(&self.title);
            text.push('\n');
        }
        if !self.keywords.is_empty() {
            text.push_str(&self.keywords.join(" "));
            text.push('\n');
        }
        text.push_str(&self.content);
        text
    }
}

/// Knowledge base file format
#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeFile {
    #[serde(default)]
    pub version: Option<String>,
    pub documents: Vec<KnowledgeDocument>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StructuredFile {
    Wrapped(KnowledgeFile),
    Bare(Vec<KnowledgeDocument>),
}

/// Knowledge loader
pub struct KnowledgeLoader;

impl KnowledgeLoader {
    /// Load every document under `path`, sorted by id.
    ///
    /// A missing path yields an empty corpus. Duplicate ids keep the first
    /// occurrence in sorted file order.
    pub fn load(path: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Knowledge path does not exist");
            return Ok(Vec::new());
        }

        let mut documents = if path.is_dir() {
            Self::load_directory(path)?
        } else {
            Self::load_file(path)?
        };

        documents.sort_by(|a, b| a.id.cmp(&b.id));
        documents.dedup_by(|later, earlier| {
            if later.id == earlier.id {
                tracing::warn!(id = %later.id, "Duplicate knowledge document id ignored");
                true
            } else {
                false
            }
        });

        tracing::info!(
            path = %path.display(),
            documents = documents.len(),
            "Loaded knowledge corpus"
        );
        Ok(documents)
    }

    fn load_directory(dir: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| RagError::Index(format!("Failed to read directory: {}", e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        let mut documents = Vec::new();
        for path in entries {
            if !Self::is_supported(&path) {
                continue;
            }
            match Self::load_file(&path) {
                Ok(docs) => {
                    tracing::debug!(file = %path.display(), count = docs.len(), "Loaded knowledge file");
                    documents.extend(docs);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping knowledge file");
                }
            }
        }
        Ok(documents)
    }

    fn is_supported(path: &Path) -> bool {
        matches!(
            Self::extension(path).as_deref(),
            Some("yaml" | "yml" | "json" | "txt" | "md")
        )
    }

    fn extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Load documents from a single file
    pub fn load_file(path: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Index(format!("Failed to read {}: {}", path.display(), e)))?;

        match Self::extension(path).as_deref() {
            Some("yaml" | "yml") => {
                let parsed: StructuredFile = serde_yaml::from_str(&content)
                    .map_err(|e| RagError::Index(format!("Invalid YAML: {}", e)))?;
                Ok(parsed.into_documents())
            }
            Some("json") => {
                let parsed: StructuredFile = serde_json::from_str(&content)
                    .map_err(|e| RagError::Index(format!("Invalid JSON: {}", e)))?;
                Ok(parsed.into_documents())
            }
            Some("txt" | "md") => Ok(Self::plain_document(path, &content).into_iter().collect()),
            _ => Err(RagError::Index(format!(
                "Unsupported knowledge file: {}",
                path.display()
            ))),
        }
    }

    fn plain_document(path: &Path, content: &str) -> Option<KnowledgeDocument> {
        let body = content.trim();
        if body.is_empty() {
            return None;
        }
        let id = path.file_stem()?.to_str()?.to_string();
        let title = body
            .lines()
            .next()
            .map(|l| l.trim_start_matches('#').trim().to_string())
            .unwrap_or_default();

        Some(KnowledgeDocument {
            id,
            title,
            content: body.to_string(),
            category: None,
            language: default_language(),
            keywords: Vec::new(),
        })
    }
}

impl StructuredFile {
    fn into_documents(self) -> Vec<KnowledgeDocument> {
        match self {
            StructuredFile::Wrapped(file) => file.documents,
            StructuredFile::Bare(docs) => docs,
        }
    }
}
