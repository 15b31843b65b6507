//! Turn pipeline stages
//!
//! A call sits in exactly one stage at a time. Turns walk the stages in
//! declaration order; `Closing` and `Closed` end the call.

use std::fmt;

use agrow_core::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PipelineStage {
    /// Waiting for the next audio segment
    #[default]
    Idle,
    Transcribing,
    ResolvingLanguage,
    /// Caller's language to the pivot language
    TranslatingIn,
    Retrieving,
    Generating,
    /// Pivot language back to the caller's language
    TranslatingOut,
    Synthesizing,
    /// Audio handed to telephony
    Responding,
    Closing,
    /// Terminal
    Closed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Transcribing => "Transcribing",
            Self::ResolvingLanguage => "ResolvingLanguage",
            Self::TranslatingIn => "TranslatingIn",
            Self::Retrieving => "Retrieving",
            Self::Generating => "Generating",
            Self::TranslatingOut => "TranslatingOut",
            Self::Synthesizing => "Synthesizing",
            Self::Responding => "Responding",
            Self::Closing => "Closing",
            Self::Closed => "Closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    /// A turn is in flight in every stage except `Idle`, `Responding` and
    /// the terminal ones
    pub fn is_busy(&self) -> bool {
        !matches!(
            self,
            Self::Idle | Self::Responding | Self::Closing | Self::Closed
        )
    }

    /// Error reported when an adapter call in this stage runs out of time
    pub fn timeout_error(&self, limit_ms: u128) -> Error {
        let msg = format!("{} timed out after {}ms", self.as_str(), limit_ms);
        match self {
            Self::Transcribing => Error::TranscriptionUnavailable(msg),
            Self::TranslatingIn | Self::TranslatingOut => Error::TranslationUnavailable(msg),
            Self::Retrieving => Error::RetrievalUnavailable(msg),
            Self::Generating => Error::GenerationUnavailable(msg),
            Self::Synthesizing => Error::SynthesisUnavailable(msg),
            _ => Error::Io(msg),
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_kinds() {
        assert_eq!(
            PipelineStage::Transcribing.timeout_error(10).kind(),
            "TranscriptionUnavailable"
        );
        assert_eq!(
            PipelineStage::TranslatingOut.timeout_error(10).kind(),
            "TranslationUnavailable"
        );
        assert_eq!(
            PipelineStage::Generating.timeout_error(10).kind(),
            "GenerationUnavailable"
        );
        assert!(PipelineStage::Synthesizing.timeout_error(10).is_retryable());
    }

    #[test]
    fn test_stage_flags() {
        assert!(PipelineStage::Generating.is_busy());
        assert!(!PipelineStage::Idle.is_busy());
        assert!(PipelineStage::Closed.is_terminal());
        assert_eq!(PipelineStage::default(), PipelineStage::Idle);
        assert_eq!(PipelineStage::TranslatingIn.to_string(), "TranslatingIn");
    }

    #[test]
    fn test_serializes_as_name() {
        let json = serde_json::to_string(&PipelineStage::Responding).unwrap();
        assert_eq!(json, "\"Responding\"");
    }
}
