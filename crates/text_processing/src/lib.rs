//! Text processing for the Agrow helpline
//!
//! This crate provides:
//! - **Translation**: regional language ↔ English pivot over HTTP
//! - **Script detection**: language hints from the transcript's characters
//! - **Speech text**: strip markup and bound answers before synthesis
//!
//! # Example
//!
//! ```ignore
//! use agrow_text_processing::{create_translator, prepare_for_speech};
//!
//! let translator = create_translator(&settings.translation)?;
//! let english = translator.translate(question, Language::Hindi, Language::English).await?;
//! let spoken = prepare_for_speech("**Apply** 50 kg DAP per acre.", 3);
//! ```

pub mod speech_text;
pub mod translation;

pub use speech_text::{clamp_sentences, expand_abbreviations, prepare_for_speech, strip_markup};
pub use translation::{
    create_translator, DisabledTranslator, SarvamConfig, SarvamTranslator, ScriptDetector,
    TranslationProvider,
};

use thiserror::Error;

/// Text processing errors
#[derive(Error, Debug)]
pub enum TextProcessingError {
    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Translation disabled")]
    Disabled,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for TextProcessingError {
    fn from(err: reqwest::Error) -> Self {
        TextProcessingError::Translation(err.to_string())
    }
}

impl From<TextProcessingError> for agrow_core::Error {
    fn from(err: TextProcessingError) -> Self {
        match err {
            TextProcessingError::Configuration(msg) => agrow_core::Error::Config(msg),
            other => agrow_core::Error::TranslationUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TextProcessingError>;
