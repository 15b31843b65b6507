//! Speech adapters for the helpline
//!
//! Features:
//! - Deepgram-style transcription with language detection
//! - Google-style synthesis with a per-language voice map
//! - Silence probe that rejects empty recordings before they cost a request

pub mod silence;
pub mod stt;
pub mod tts;

pub use silence::{probe_speech, rms_level};
pub use stt::{DeepgramConfig, DeepgramTranscriber};
pub use tts::{voice_for, GoogleTts, GoogleTtsConfig};

use std::sync::Arc;
use std::time::Duration;

use agrow_config::constants::policy;
use agrow_config::{SynthesisConfig, TranscriptionConfig};
use agrow_core::{SpeechSynthesizer, Transcriber};
use thiserror::Error;

/// Build the configured speech-to-text backend
pub fn create_transcriber(
    config: &TranscriptionConfig,
) -> Result<Arc<dyn Transcriber>, PipelineError> {
    let transcriber = DeepgramTranscriber::new(DeepgramConfig {
        endpoint: config.endpoint.clone(),
        api_key: config.api_key.clone(),
        model: config.model.clone(),
        timeout: Duration::from_millis(config.timeout_ms),
        silence_floor: policy::SILENCE_RMS_FLOOR,
    })?;
    Ok(Arc::new(transcriber))
}

/// Build the configured text-to-speech backend
pub fn create_synthesizer(
    config: &SynthesisConfig,
) -> Result<Arc<dyn SpeechSynthesizer>, PipelineError> {
    let synthesizer = GoogleTts::new(GoogleTtsConfig {
        endpoint: config.endpoint.clone(),
        api_key: config.api_key.clone(),
        speaking_rate: config.speaking_rate,
        timeout: Duration::from_millis(config.timeout_ms),
    })?;
    Ok(Arc::new(synthesizer))
}

/// Speech adapter errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("No speech in audio")]
    EmptyAudio,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<PipelineError> for agrow_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Stt(msg) => agrow_core::Error::TranscriptionUnavailable(msg),
            PipelineError::Tts(msg) => agrow_core::Error::SynthesisUnavailable(msg),
            PipelineError::EmptyAudio => agrow_core::Error::EmptyAudio,
            PipelineError::Configuration(msg) => agrow_core::Error::Config(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backends_build_from_default_settings() {
        let transcriber = create_transcriber(&TranscriptionConfig::default()).unwrap();
        assert!(!transcriber.model_name().is_empty());
        let synthesizer = create_synthesizer(&SynthesisConfig::default()).unwrap();
        assert!(!synthesizer.model_name().is_empty());
    }

    #[test]
    fn test_error_mapping() {
        let err: agrow_core::Error = PipelineError::EmptyAudio.into();
        assert_eq!(err, agrow_core::Error::EmptyAudio);
        let err: agrow_core::Error = PipelineError::Tts("quota".into()).into();
        assert_eq!(err.kind(), "SynthesisUnavailable");
    }
}
