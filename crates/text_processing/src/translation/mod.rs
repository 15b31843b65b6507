//! Translation module with script detection
//!
//! Questions are translated into English before generation and answers are
//! translated back (Translate-Think-Translate). The [`Translator`] trait
//! guarantees passthrough for identical languages, so backends here only
//! handle real language pairs.

mod detect;
mod disabled;
mod sarvam;

pub use detect::ScriptDetector;
pub use disabled::DisabledTranslator;
pub use sarvam::{SarvamConfig, SarvamTranslator};

use std::sync::Arc;
use std::time::Duration;

pub use agrow_config::TranslationProvider;

use agrow_config::TranslationConfig;
use agrow_core::Translator;

use crate::Result;

/// Create translator based on config
pub fn create_translator(config: &TranslationConfig) -> Result<Arc<dyn Translator>> {
    match config.provider {
        TranslationProvider::Sarvam => {
            let translator = SarvamTranslator::new(SarvamConfig {
                endpoint: config.endpoint.clone(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
                timeout: Duration::from_millis(config.timeout_ms),
                ..Default::default()
            })?;
            tracing::info!(endpoint = %config.endpoint, model = %config.model, "Using Sarvam translator");
            Ok(Arc::new(translator))
        }
        TranslationProvider::Disabled => {
            tracing::warn!("Translation disabled; non-English callers rely on generator capabilities");
            Ok(Arc::new(DisabledTranslator))
        }
    }
}
