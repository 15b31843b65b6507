//! Configuration management for the Agrow helpline
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (`AGROW__` prefix, `__` separator)
//!
//! Policy values the orchestrator depends on are fixed in [`constants`].

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, GenerationConfig, MessagingConfig, ObservabilityConfig, RetrievalBackend,
    RetrievalConfig, RuntimeEnvironment, ServerConfig, SessionConfig, Settings, SynthesisConfig,
    TelephonyConfig, TranscriptionConfig, TranslationConfig, TranslationProvider,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for agrow_core::Error {
    fn from(err: ConfigError) -> Self {
        agrow_core::Error::Config(err.to_string())
    }
}
