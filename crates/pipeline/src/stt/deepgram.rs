//! Deepgram transcription backend
//!
//! Sends the whole recorded segment to `/v1/listen` with language detection
//! enabled and maps the first alternative of the first channel.

use std::time::Duration;

use agrow_config::constants::{endpoints, policy, timeouts};
use agrow_core::{AudioClip, Result, Transcriber, Transcription};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use crate::silence::probe_speech;
use crate::PipelineError;

/// Deepgram backend configuration
#[derive(Debug, Clone)]
pub struct DeepgramConfig {
    /// Base URL, without the `/v1` suffix
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    /// WAV clips quieter than this are rejected without a request
    pub silence_floor: f32,
}

impl Default for DeepgramConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::DEEPGRAM_DEFAULT.to_string(),
            api_key: None,
            model: "nova-2".to_string(),
            timeout: Duration::from_millis(timeouts::TRANSCRIPTION_MS),
            silence_floor: policy::SILENCE_RMS_FLOOR,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
    #[serde(default)]
    detected_language: Option<String>,
    #[serde(default)]
    language_confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: f32,
}

/// Deepgram transcriber
pub struct DeepgramTranscriber {
    client: reqwest::Client,
    config: DeepgramConfig,
}

impl DeepgramTranscriber {
    pub fn new(config: DeepgramConfig) -> std::result::Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn listen(&self, audio: &AudioClip) -> std::result::Result<Transcription, PipelineError> {
        probe_speech(audio, self.config.silence_floor)?;

        let url = format!("{}/v1/listen", self.config.endpoint.trim_end_matches('/'));
        let mut request = self
            .client
            .post(&url)
            .query(&[
                ("model", self.config.model.as_str()),
                ("detect_language", "true"),
                ("smart_format", "true"),
                ("punctuate", "true"),
            ])
            .header(reqwest::header::CONTENT_TYPE, audio.mime_type())
            .body(audio.bytes.clone());

        if let Some(key) = &self.config.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::Stt(format!("Deepgram request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Stt(format!(
                "Deepgram returned {}: {}",
                status, body
            )));
        }

        let parsed: ListenResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Stt(format!("Failed to parse Deepgram response: {}", e)))?;

        let channel = parsed
            .results
            .channels
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Stt("Deepgram returned no channels".to_string()))?;

        let alternative = channel.alternatives.into_iter().next();
        let (text, confidence) = match alternative {
            Some(alt) => (alt.transcript.trim().to_string(), alt.confidence),
            None => (String::new(), 0.0),
        };

        if text.is_empty() {
            return Err(PipelineError::EmptyAudio);
        }

        // Deepgram reports transcript confidence and language confidence
        // separately; the weaker of the two bounds how far the tag can be
        // trusted.
        let confidence = channel
            .language_confidence
            .map_or(confidence, |lc| lc.min(confidence));

        Ok(Transcription::new(text, channel.detected_language, confidence))
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    #[instrument(skip_all, fields(bytes = audio.len(), model = %self.config.model))]
    async fn transcribe(&self, audio: &AudioClip) -> Result<Transcription> {
        let transcription = self.listen(audio).await?;
        tracing::debug!(
            language = ?transcription.detected_language,
            confidence = transcription.confidence,
            "Transcribed segment"
        );
        Ok(transcription)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
