//! Sarvam AI translation backend

use std::time::Duration;

use agrow_config::constants::{endpoints, timeouts};
use agrow_core::{Language, Result, Translator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use unicode_segmentation::UnicodeSegmentation;

use crate::TextProcessingError;

/// Sarvam translator configuration
#[derive(Debug, Clone)]
pub struct SarvamConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    /// Longest input the API accepts in one request (chars)
    pub max_chunk_chars: usize,
}

impl Default for SarvamConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::SARVAM_DEFAULT.to_string(),
            api_key: None,
            model: "mayura:v1".to_string(),
            timeout: Duration::from_millis(timeouts::TRANSLATION_MS),
            max_chunk_chars: 900,
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    input: &'a str,
    source_language_code: String,
    target_language_code: String,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translated_text: String,
}

/// Translator backed by the Sarvam `/translate` endpoint
pub struct SarvamTranslator {
    client: reqwest::Client,
    config: SarvamConfig,
}

impl SarvamTranslator {
    pub fn new(config: SarvamConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TextProcessingError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Split at sentence boundaries so no request exceeds the input limit.
    ///
    /// A single sentence longer than the limit is sent whole; the service
    /// rejecting it is preferable to cutting words in half.
    fn chunks<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let limit = self.config.max_chunk_chars;
        if text.chars().count() <= limit {
            return vec![text];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut len = 0;
        for (offset, sentence) in text.split_sentence_bound_indices() {
            let n = sentence.chars().count();
            if len > 0 && len + n > limit {
                chunks.push(&text[start..offset]);
                start = offset;
                len = 0;
            }
            len += n;
        }
        if start < text.len() {
            chunks.push(&text[start..]);
        }
        chunks
    }

    async fn translate_chunk(&self, text: &str, from: Language, to: Language) -> crate::Result<String> {
        let body = TranslateRequest {
            input: text,
            source_language_code: from.locale(),
            target_language_code: to.locale(),
            model: &self.config.model,
        };

        let url = format!("{}/translate", self.config.endpoint.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header("api-subscription-key", key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TextProcessingError::Translation(format!(
                "Sarvam returned {}: {}",
                status, text
            )));
        }

        let parsed: TranslateResponse = response.json().await?;
        if parsed.translated_text.trim().is_empty() {
            return Err(TextProcessingError::Translation(
                "Sarvam returned an empty translation".to_string(),
            ));
        }

        Ok(parsed.translated_text)
    }
}

#[async_trait]
impl Translator for SarvamTranslator {
    #[instrument(skip_all, fields(from = %from, to = %to, chars = text.chars().count()))]
    async fn translate_pair(&self, text: &str, from: Language, to: Language) -> Result<String> {
        let mut translated = Vec::new();
        for chunk in self.chunks(text) {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            translated.push(self.translate_chunk(chunk, from, to).await?);
        }
        Ok(translated.join(" "))
    }

    fn name(&self) -> &str {
        "sarvam"
    }
}
