//! Answer generation
//!
//! Features:
//! - OpenAI-compatible chat backend (Groq by default)
//! - Prompt construction with a bounded history window
//! - Speech-safe output shaping behind the core `AnswerGenerator` trait

pub mod adapter;
pub mod backend;
pub mod prompt;

pub use adapter::{create_generator, ChatAnswerGenerator};
pub use backend::{ChatBackend, FinishReason, GenerationResult, LlmBackend, OpenAIConfig};
pub use prompt::{Message, PromptBuilder, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Empty answer")]
    Empty,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for agrow_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Empty => agrow_core::Error::GenerationEmpty,
            LlmError::Configuration(msg) => agrow_core::Error::Config(msg),
            other => agrow_core::Error::GenerationUnavailable(other.to_string()),
        }
    }
}
