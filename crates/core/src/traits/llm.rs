//! Answer generation trait

use crate::{HistoryTurn, Language, Result, Snippet};
use async_trait::async_trait;

/// Produce a short spoken answer to a caller's question.
///
/// Implementations receive only the bounded window of history the caller
/// chose to pass, and must return plain sentences suitable for speech
/// synthesis.
///
/// # Errors
/// - `GenerationUnavailable` on service failure
/// - `GenerationEmpty` when the service answers with nothing usable
#[async_trait]
pub trait AnswerGenerator: Send + Sync + 'static {
    /// Answer `question`, written in `language`, in that same language
    async fn generate(
        &self,
        question: &str,
        language: Language,
        context: &[Snippet],
        history: &[HistoryTurn],
    ) -> Result<String>;

    /// Languages the model can read and answer in without translation
    fn capabilities(&self) -> &[Language];

    /// Get model name for logging
    fn model_name(&self) -> &str;

    fn supports_language(&self, lang: Language) -> bool {
        self.capabilities().contains(&lang)
    }
}
