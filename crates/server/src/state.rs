//! Application State
//!
//! Shared state across all handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use agrow_agent::{
    Adapters, OrchestratorConfig, SummaryConfig, SummaryDispatcher, TurnOrchestrator,
};
use agrow_config::Settings;
use axum::http::{header, HeaderMap};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::audio_store::AudioStore;
use crate::recording::RecordingFetcher;
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub orchestrator: Arc<TurnOrchestrator>,
    pub audio: Arc<AudioStore>,
    pub recordings: Arc<RecordingFetcher>,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
    ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: Settings, orchestrator: Arc<TurnOrchestrator>) -> Result<Self, ServerError> {
        let recordings = RecordingFetcher::new(&config.telephony)?;
        Ok(Self {
            config: Arc::new(config),
            orchestrator,
            audio: Arc::new(AudioStore::new()),
            recordings: Arc::new(recordings),
            metrics: None,
            ready: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Build every adapter named by `config` and the orchestrator over them
    pub fn from_settings(config: Settings) -> Result<Self, ServerError> {
        let startup = |e: &dyn std::fmt::Display| ServerError::Startup(e.to_string());

        let translator = agrow_text_processing::create_translator(&config.translation)
            .map_err(|e| startup(&e))?;
        let adapters = Adapters {
            transcriber: agrow_pipeline::create_transcriber(&config.transcription)
                .map_err(|e| startup(&e))?,
            translator: translator.clone(),
            retriever: agrow_rag::create_retriever(&config.retrieval).map_err(|e| startup(&e))?,
            generator: agrow_llm::create_generator(&config.generation).map_err(|e| startup(&e))?,
            synthesizer: agrow_pipeline::create_synthesizer(&config.synthesis)
                .map_err(|e| startup(&e))?,
        };
        let channel = agrow_messaging::create_channel(&config.messaging, &config.telephony)
            .map_err(|e| startup(&e))?;

        tracing::info!(
            transcriber = adapters.transcriber.model_name(),
            translator = adapters.translator.name(),
            retriever = adapters.retriever.name(),
            generator = adapters.generator.model_name(),
            synthesizer = adapters.synthesizer.model_name(),
            channel = channel.channel_name(),
            "Adapters ready"
        );

        let summaries = Arc::new(SummaryDispatcher::new(
            channel,
            translator,
            SummaryConfig::from_settings(&config),
        ));
        let orchestrator = Arc::new(TurnOrchestrator::new(
            adapters,
            summaries,
            OrchestratorConfig::from_settings(&config),
        ));
        Self::new(config, orchestrator)
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn get_config(&self) -> &Settings {
        &self.config
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Externally reachable base URL for links handed to telephony
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.config.telephony.public_base_url {
            return base.trim_end_matches('/').to_string();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("https");
        format!("{}://{}", scheme, host)
    }
}
