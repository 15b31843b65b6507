//! Adapter seams of the helpline
//!
//! Every external capability the turn orchestrator calls sits behind one of
//! these traits, so backends can be swapped by configuration and replaced
//! with mocks in tests.
//!
//! ```text
//! Speech:
//!   - Transcriber: recorded audio → text + detected language
//!   - SpeechSynthesizer: text → playable audio
//!
//! Language:
//!   - Translator: regional language ↔ pivot language
//!   - AnswerGenerator: question + context + history → short answer
//!
//! Retrieval:
//!   - Retriever: pivot query → ranked snippets
//!
//! Delivery:
//!   - MessageChannel: caller identifier + text → delivered message
//! ```

mod llm;
mod messaging;
mod retriever;
mod speech;
mod translation;

pub use llm::AnswerGenerator;
pub use messaging::{DeliveryReceipt, MessageChannel};
pub use retriever::{rank_snippets, Retriever, Snippet};
pub use speech::{SpeechSynthesizer, Transcriber};
pub use translation::Translator;
