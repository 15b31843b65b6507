//! Text-to-speech backends

mod google;

pub use google::{voice_for, GoogleTts, GoogleTtsConfig};
