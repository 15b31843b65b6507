//! Prompt Building
//!
//! Constructs chat prompts for the helpline assistant.

use std::fmt;

use agrow_config::constants::policy;
use agrow_core::{HistoryTurn, Language, Snippet};
use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are a helpful agricultural helpline assistant for Indian farmers. \
Provide practical, safe, and region-agnostic advice. Keep answers concise.";

/// Prompt builder for the helpline assistant
pub struct PromptBuilder {
    messages: Vec<Message>,
    history_window: usize,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            history_window: policy::HISTORY_WINDOW_TURNS,
        }
    }

    /// Override how many prior turns are replayed
    pub fn history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Base instructions, plus the answer language when it is not English
    pub fn system_prompt(mut self, language: Language) -> Self {
        let mut system = format!(
            "{SYSTEM_PROMPT}\n\nThis is a phone call: answer in at most {} short sentences of plain \
             spoken text. Do not use bullet points, headings, or markdown.",
            policy::MAX_ANSWER_SENTENCES
        );
        if !language.is_pivot() {
            system.push_str(&format!(
                "\nRespond in {}, written in its native script.",
                language.name()
            ));
        }
        self.messages.push(Message::system(system));
        self
    }

    /// Add retrieved reference material
    pub fn with_context(mut self, snippets: &[Snippet]) -> Self {
        if !snippets.is_empty() {
            let body = snippets
                .iter()
                .enumerate()
                .map(|(i, s)| format!("[{}] {}", i + 1, s.text.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            self.messages.push(Message::system(format!(
                "## Relevant Information\n{}\n\nUse this information to answer the farmer's question if relevant.",
                body
            )));
        }
        self
    }

    /// Replay the most recent turns, oldest first
    pub fn with_history(mut self, history: &[HistoryTurn]) -> Self {
        let skip = history.len().saturating_sub(self.history_window);
        for turn in &history[skip..] {
            self.messages.push(Message::user(turn.question.clone()));
            self.messages.push(Message::assistant(turn.answer.clone()));
        }
        self
    }

    pub fn user_message(mut self, message: &str) -> Self {
        self.messages.push(Message::user(message));
        self
    }

    pub fn build(self) -> Vec<Message> {
        self.messages
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
