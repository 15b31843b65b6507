//! Error taxonomy shared by every crate in the workspace
//!
//! Adapter crates define their own error enums and convert into [`Error`],
//! so the orchestrator only ever reasons about the kinds listed here.

use thiserror::Error;

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Speech-to-text service failed or timed out
    #[error("Transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    /// Audio contained no discernible speech
    #[error("Audio contains no speech")]
    EmptyAudio,

    #[error("Translation unavailable: {0}")]
    TranslationUnavailable(String),

    /// Retrieval failures never fail a turn; they degrade to empty context
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// The model answered with nothing usable
    #[error("Generation returned an empty answer")]
    GenerationEmpty,

    #[error("Synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    /// Operation against a call that has already been closed
    #[error("Session closed: {0}")]
    SessionClosed(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Summary delivery failed: {0}")]
    SummaryDeliveryFailed(String),

    /// The turn as a whole ran past its deadline
    #[error("Turn exceeded its {0}ms deadline")]
    TurnDeadlineExceeded(u64),

    /// In-flight work was abandoned because the call terminated
    #[error("Cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl Error {
    /// Stable identifier surfaced in `status_detail` and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TranscriptionUnavailable(_) => "TranscriptionUnavailable",
            Self::EmptyAudio => "EmptyAudio",
            Self::TranslationUnavailable(_) => "TranslationUnavailable",
            Self::RetrievalUnavailable(_) => "RetrievalUnavailable",
            Self::GenerationUnavailable(_) => "GenerationUnavailable",
            Self::GenerationEmpty => "GenerationEmpty",
            Self::SynthesisUnavailable(_) => "SynthesisUnavailable",
            Self::SessionClosed(_) => "SessionClosed",
            Self::SessionNotFound(_) => "SessionNotFound",
            Self::SummaryDeliveryFailed(_) => "SummaryDeliveryFailed",
            Self::TurnDeadlineExceeded(_) => "TurnDeadlineExceeded",
            Self::Cancelled => "Cancelled",
            Self::Config(_) => "Config",
            Self::Io(_) => "Io",
        }
    }

    /// Transient adapter failures get one bounded retry.
    ///
    /// `EmptyAudio` and `GenerationEmpty` are answers from a healthy service,
    /// so asking again would only repeat them.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TranscriptionUnavailable(_)
                | Self::TranslationUnavailable(_)
                | Self::RetrievalUnavailable(_)
                | Self::GenerationUnavailable(_)
                | Self::SynthesisUnavailable(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
