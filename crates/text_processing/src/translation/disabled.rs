//! Translator that refuses every cross-language request

use agrow_core::{Language, Result, Translator};
use async_trait::async_trait;

use crate::TextProcessingError;

/// Stand-in when no translation service is configured.
///
/// Returning the input unchanged would hand regional text to the generator
/// as if it were English, so this fails instead.
pub struct DisabledTranslator;

#[async_trait]
impl Translator for DisabledTranslator {
    async fn translate_pair(&self, _text: &str, _from: Language, _to: Language) -> Result<String> {
        Err(TextProcessingError::Disabled.into())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_language_still_passes_through() {
        let t = DisabledTranslator;
        assert_eq!(
            t.translate("hello", Language::English, Language::English).await.unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_cross_language_fails() {
        let err = DisabledTranslator
            .translate("नमस्ते", Language::Hindi, Language::English)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "TranslationUnavailable");
    }
}
