//! Speech recognition output

use serde::{Deserialize, Serialize};

/// What the transcription service heard.
///
/// `detected_language` is the raw tag reported by the service (for example
/// `hi` or `ta-IN`) and may name a language the helpline does not serve;
/// deciding what to do with it is the language resolver's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub detected_language: Option<String>,
    /// Normalized to 0.0..=1.0
    pub confidence: f32,
}

impl Transcription {
    pub fn new(text: impl Into<String>, detected_language: Option<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            detected_language,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
