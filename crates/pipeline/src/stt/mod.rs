//! Speech-to-text backends

mod deepgram;

pub use deepgram::{DeepgramConfig, DeepgramTranscriber};
