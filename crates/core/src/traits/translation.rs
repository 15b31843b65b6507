//! Translation trait

use crate::{Language, Result};
use async_trait::async_trait;

/// Translate between a regional language and the pivot language.
///
/// Callers use [`Translator::translate`]; implementations only provide
/// [`Translator::translate_pair`], which is never reached for identical
/// languages or blank text. That keeps `translate(t, L, L) == t` true for
/// every backend.
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    /// Translate `text` from `from` into `to`
    async fn translate(&self, text: &str, from: Language, to: Language) -> Result<String> {
        if from == to || text.trim().is_empty() {
            return Ok(text.to_string());
        }
        self.translate_pair(text, from, to).await
    }

    /// Backend call for a pair of distinct languages
    ///
    /// # Errors
    /// `TranslationUnavailable` on service failure
    async fn translate_pair(&self, text: &str, from: Language, to: Language) -> Result<String>;

    /// Get translator name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    /// Fails every real translation so any passthrough leak is visible
    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        async fn translate_pair(&self, _text: &str, _from: Language, _to: Language) -> Result<String> {
            Err(Error::TranslationUnavailable("down".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_passthrough_for_same_language() {
        let t = FailingTranslator;
        for lang in Language::all() {
            let out = t.translate("गेहूं में पीला रतुआ", *lang, *lang).await.unwrap();
            assert_eq!(out, "गेहूं में पीला रतुआ");
        }
    }

    #[tokio::test]
    async fn test_blank_text_passthrough() {
        let t = FailingTranslator;
        let out = t.translate("  ", Language::Hindi, Language::English).await.unwrap();
        assert_eq!(out, "  ");
    }

    #[tokio::test]
    async fn test_distinct_pair_reaches_backend() {
        let t = FailingTranslator;
        let err = t
            .translate("hello", Language::English, Language::Tamil)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "TranslationUnavailable");
    }
}
