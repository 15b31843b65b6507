//! Core traits and types for the Agrow helpline
//!
//! This crate provides foundational types used across all other crates:
//! - Adapter traits for pluggable backends (STT, translation, retrieval,
//!   generation, TTS, messaging)
//! - Language definitions and script detection
//! - Audio payloads
//! - The error taxonomy
//! - Conversation records

pub mod audio;
pub mod conversation;
pub mod error;
pub mod language;
pub mod traits;
pub mod transcript;

pub use audio::{AudioClip, AudioFormat};
pub use conversation::{HistoryTurn, TurnRecord};
pub use error::{Error, Result};
pub use language::{Language, Script};
pub use transcript::Transcription;

pub use traits::{
    rank_snippets, AnswerGenerator, DeliveryReceipt, MessageChannel, Retriever, Snippet,
    SpeechSynthesizer, Transcriber, Translator,
};
