//! Retriever trait for grounding context

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A passage of the knowledge corpus with its relevance to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub text: String,
    pub score: f32,
}

impl Snippet {
    pub fn new(id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            score,
        }
    }
}

/// Query the knowledge corpus.
///
/// Results are sorted by descending score, at most `k` long, and possibly
/// empty. Identical queries against an unchanged corpus return identical
/// results.
#[async_trait]
pub trait Retriever: Send + Sync + 'static {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Snippet>>;

    /// Get retriever name
    fn name(&self) -> &str;
}

/// Order snippets by descending score, then ascending id, and keep `k`.
///
/// NaN scores sort last.
pub fn rank_snippets(mut snippets: Vec<Snippet>, k: usize) -> Vec<Snippet> {
    snippets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or_else(|| a.score.is_nan().cmp(&b.score.is_nan()))
            .then_with(|| a.id.cmp(&b.id))
    });
    snippets.truncate(k);
    snippets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_orders_and_truncates() {
        let ranked = rank_snippets(
            vec![
                Snippet::new("b", "two", 0.5),
                Snippet::new("a", "one", 0.9),
                Snippet::new("c", "three", 0.5),
                Snippet::new("d", "four", 0.1),
            ],
            3,
        );
        let ids: Vec<_> = ranked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rank_nan_last() {
        let ranked = rank_snippets(
            vec![Snippet::new("x", "", f32::NAN), Snippet::new("y", "", 0.2)],
            5,
        );
        assert_eq!(ranked[0].id, "y");
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_rank_zero_k() {
        assert!(rank_snippets(vec![Snippet::new("a", "", 1.0)], 0).is_empty());
    }
}
