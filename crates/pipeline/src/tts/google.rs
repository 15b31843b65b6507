//! Google Cloud Text-to-Speech backend
//!
//! Returns MP3, which the telephony provider plays directly.

use std::time::Duration;

use agrow_config::constants::{endpoints, timeouts};
use agrow_core::{AudioClip, AudioFormat, Language, Result, SpeechSynthesizer};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::PipelineError;

/// Google TTS configuration
#[derive(Debug, Clone)]
pub struct GoogleTtsConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub speaking_rate: f32,
    pub timeout: Duration,
}

impl Default for GoogleTtsConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::GOOGLE_TTS_DEFAULT.to_string(),
            api_key: None,
            speaking_rate: 0.95,
            timeout: Duration::from_millis(timeouts::SYNTHESIS_MS),
        }
    }
}

/// Female voice per language; Telugu and Odia have no WaveNet voice
pub fn voice_for(language: Language) -> &'static str {
    match language {
        Language::Hindi => "hi-IN-Wavenet-D",
        Language::Tamil => "ta-IN-Wavenet-A",
        Language::Telugu => "te-IN-Standard-A",
        Language::Kannada => "kn-IN-Wavenet-A",
        Language::Malayalam => "ml-IN-Wavenet-A",
        Language::Bengali => "bn-IN-Wavenet-A",
        Language::Gujarati => "gu-IN-Wavenet-A",
        Language::Marathi => "mr-IN-Wavenet-A",
        Language::Punjabi => "pa-IN-Wavenet-A",
        Language::English => "en-IN-Wavenet-D",
        Language::Odia => "or-IN-Standard-A",
    }
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct VoiceSelection<'a> {
    #[serde(rename = "languageCode")]
    language_code: String,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct AudioConfig {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'static str,
    #[serde(rename = "speakingRate")]
    speaking_rate: f32,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent", default)]
    audio_content: String,
}

/// Google Cloud TTS client
pub struct GoogleTts {
    client: reqwest::Client,
    config: GoogleTtsConfig,
}

impl GoogleTts {
    pub fn new(config: GoogleTtsConfig) -> std::result::Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn request(&self, text: &str, language: Language) -> std::result::Result<AudioClip, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::Tts("Nothing to synthesize".to_string()));
        }

        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: language.locale(),
                name: voice_for(language),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: self.config.speaking_rate,
            },
        };

        let url = format!("{}/v1/text:synthesize", self.config.endpoint.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::Tts(format!("Google TTS request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Tts(format!(
                "Google TTS returned {}: {}",
                status, text
            )));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Tts(format!("Failed to parse Google TTS response: {}", e)))?;

        if parsed.audio_content.is_empty() {
            return Err(PipelineError::Tts("Google TTS returned no audio content".to_string()));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(parsed.audio_content.as_bytes())
            .map_err(|e| PipelineError::Tts(format!("Invalid audio content: {}", e)))?;

        Ok(AudioClip::new(bytes, AudioFormat::Mp3))
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    #[instrument(skip_all, fields(language = %language, chars = text.chars().count()))]
    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioClip> {
        Ok(self.request(text, language).await?)
    }

    fn model_name(&self) -> &str {
        "google-tts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_map_covers_every_language() {
        for lang in Language::all() {
            assert!(voice_for(*lang).starts_with(lang.code()));
        }
    }

    #[test]
    fn test_request_shape() {
        let body = SynthesizeRequest {
            input: SynthesisInput { text: "नमस्ते" },
            voice: VoiceSelection {
                language_code: Language::Hindi.locale(),
                name: voice_for(Language::Hindi),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: 1.0,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["voice"]["languageCode"], "hi-IN");
        assert_eq!(json["voice"]["name"], "hi-IN-Wavenet-D");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
    }
}
