//! Answer generator adapter
//!
//! Bridges an [`LlmBackend`] to the core `AnswerGenerator` trait: builds the
//! prompt, calls the backend, and shapes the reply for speech.

use std::sync::Arc;

use agrow_config::{constants::policy, GenerationConfig};
use agrow_core::{AnswerGenerator, HistoryTurn, Language, Result, Snippet};
use agrow_text_processing::prepare_for_speech;
use async_trait::async_trait;
use tracing::instrument;

use crate::backend::{ChatBackend, FinishReason, LlmBackend, OpenAIConfig};
use crate::prompt::PromptBuilder;
use crate::LlmError;

pub struct ChatAnswerGenerator {
    backend: Arc<dyn LlmBackend>,
    capabilities: Vec<Language>,
    model_name: String,
}

impl ChatAnswerGenerator {
    /// `capabilities` lists the languages the model answers in directly.
    /// English is always included.
    pub fn new(backend: Arc<dyn LlmBackend>, mut capabilities: Vec<Language>) -> Self {
        if !capabilities.contains(&Language::PIVOT) {
            capabilities.insert(0, Language::PIVOT);
        }
        let model_name = backend.model_name().to_string();
        Self {
            backend,
            capabilities,
            model_name,
        }
    }
}

#[async_trait]
impl AnswerGenerator for ChatAnswerGenerator {
    #[instrument(skip_all, fields(model = %self.model_name, language = %language, snippets = context.len()))]
    async fn generate(
        &self,
        question: &str,
        language: Language,
        context: &[Snippet],
        history: &[HistoryTurn],
    ) -> Result<String> {
        let messages = PromptBuilder::new()
            .system_prompt(language)
            .with_context(context)
            .with_history(history)
            .user_message(question)
            .build();

        let result = self.backend.generate(&messages).await?;
        if result.finish_reason == FinishReason::Length {
            tracing::debug!(tokens = result.tokens, "Answer hit the token limit; clamping");
        }

        let answer = prepare_for_speech(&result.text, policy::MAX_ANSWER_SENTENCES);
        if answer.trim().is_empty() {
            return Err(LlmError::Empty.into());
        }
        Ok(answer)
    }

    fn capabilities(&self) -> &[Language] {
        &self.capabilities
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Build the configured answer generator
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn AnswerGenerator>> {
    let backend = ChatBackend::new(OpenAIConfig::from(config))?;
    tracing::info!(
        endpoint = %config.endpoint,
        model = %config.model,
        "Answer generator ready"
    );
    Ok(Arc::new(ChatAnswerGenerator::new(
        Arc::new(backend),
        config.capability_languages(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GenerationResult;
    use crate::prompt::{Message, Role};
    use std::sync::Mutex;

    struct CannedBackend {
        reply: String,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl LlmBackend for CannedBackend {
        async fn generate(&self, messages: &[Message]) -> std::result::Result<GenerationResult, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(GenerationResult {
                text: self.reply.clone(),
                tokens: 12,
                total_time_ms: 5,
                finish_reason: FinishReason::Stop,
            })
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn generator(reply: &str) -> (ChatAnswerGenerator, Arc<CannedBackend>) {
        let backend = Arc::new(CannedBackend {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        (
            ChatAnswerGenerator::new(backend.clone(), vec![Language::Hindi]),
            backend,
        )
    }

    #[tokio::test]
    async fn test_answer_is_sanitized_and_clamped() {
        let (gen, _) = generator(
            "**Water early.** Use mulch. Check soil moisture. Avoid midday irrigation. Done.",
        );
        let answer = gen.generate("when to water", Language::English, &[], &[]).await.unwrap();
        assert!(!answer.contains("**"));
        assert!(answer.starts_with("Water early."));
        assert!(!answer.contains("Avoid midday"));
    }

    #[tokio::test]
    async fn test_blank_answer_is_generation_empty() {
        let (gen, _) = generator("  **  ");
        let err = gen.generate("q", Language::English, &[], &[]).await.unwrap_err();
        assert_eq!(err, agrow_core::Error::GenerationEmpty);
    }

    #[tokio::test]
    async fn test_history_window_reaches_backend() {
        let (gen, backend) = generator("ok.");
        let history: Vec<_> = (0..6)
            .map(|i| HistoryTurn {
                question: format!("q{i}"),
                answer: format!("a{i}"),
            })
            .collect();
        gen.generate("now", Language::English, &[], &history).await.unwrap();

        let seen = backend.seen.lock().unwrap();
        let users = seen[0].iter().filter(|m| m.role == Role::User).count();
        assert_eq!(users, policy::HISTORY_WINDOW_TURNS + 1);
    }

    #[test]
    fn test_capabilities_include_pivot() {
        let (gen, _) = generator("x");
        assert!(gen.supports_language(Language::English));
        assert!(gen.supports_language(Language::Hindi));
        assert!(!gen.supports_language(Language::Tamil));
    }
}
