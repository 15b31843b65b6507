//! Speech processing traits

use crate::{AudioClip, Language, Result, Transcription};
use async_trait::async_trait;

/// Speech-to-text interface
///
/// Implementations report what they heard and how sure they are. They never
/// apply a confidence threshold themselves; that decision belongs to the
/// caller.
///
/// # Errors
/// - `TranscriptionUnavailable` on network or service failure
/// - `EmptyAudio` when the clip holds no discernible speech
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe one recorded segment
    async fn transcribe(&self, audio: &AudioClip) -> Result<Transcription>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Text-to-speech interface
///
/// # Example
///
/// ```ignore
/// let tts: Arc<dyn SpeechSynthesizer> = Arc::new(GoogleTts::new(config)?);
/// let audio = tts.synthesize("नमस्ते", Language::Hindi).await?;
/// ```
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Render `text` in the voice configured for `language`
    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioClip>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudioFormat;

    struct MockTts;

    #[async_trait]
    impl SpeechSynthesizer for MockTts {
        async fn synthesize(&self, text: &str, _language: Language) -> Result<AudioClip> {
            Ok(AudioClip::new(text.as_bytes().to_vec(), AudioFormat::Mp3))
        }

        fn model_name(&self) -> &str {
            "mock-tts"
        }
    }

    #[tokio::test]
    async fn test_synthesizer_object_safe() {
        let tts: Box<dyn SpeechSynthesizer> = Box::new(MockTts);
        let clip = tts.synthesize("hello", Language::English).await.unwrap();
        assert_eq!(clip.mime_type(), "audio/mpeg");
        assert_eq!(tts.model_name(), "mock-tts");
    }
}
