//! Conversation records kept per call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Language;

/// One completed question/answer exchange.
///
/// `question_text`/`answer_text` are in `language`, the language the caller
/// heard; the `*_pivot` fields hold the English text the model worked with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub question_text: String,
    pub answer_text: String,
    pub question_pivot: String,
    pub answer_pivot: String,
    pub language: Language,
    pub timestamp: DateTime<Utc>,
    /// False when the fallback cue was played instead of the answer
    pub spoken: bool,
}

/// A prior exchange handed to the answer generator as context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub question: String,
    pub answer: String,
}

impl From<&TurnRecord> for HistoryTurn {
    fn from(turn: &TurnRecord) -> Self {
        Self {
            question: turn.question_pivot.clone(),
            answer: turn.answer_pivot.clone(),
        }
    }
}
