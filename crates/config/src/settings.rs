//! Main settings module

use agrow_core::Language;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{endpoints, policy, timeouts};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - missing credentials are tolerated
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Telephony provider (Twilio) webhooks and credentials
    #[serde(default)]
    pub telephony: TelephonyConfig,

    #[serde(default)]
    pub transcription: TranscriptionConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Summary delivery channel
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Call limits and session housekeeping
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_timeouts()?;
        self.validate_generation()?;
        self.validate_retrieval()?;
        self.validate_session()?;

        if self.environment.is_strict() {
            self.validate_credentials()?;
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        // The recording webhook downloads audio and then runs a whole turn
        let webhook_budget_ms =
            self.session.turn_deadline_secs * 1000 + self.telephony.download_timeout_ms;
        if webhook_budget_ms >= self.server.timeout_seconds * 1000 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: format!(
                    "Must exceed the turn deadline plus recording download ({}ms), got {}s",
                    webhook_budget_ms, self.server.timeout_seconds
                ),
            });
        }

        if self.environment.is_production() && !self.server.cors_enabled {
            return Err(ConfigError::InvalidValue {
                field: "server.cors_enabled".to_string(),
                message: "CORS cannot be disabled in production".to_string(),
            });
        }

        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), ConfigError> {
        let checks = [
            ("transcription.timeout_ms", self.transcription.timeout_ms),
            ("translation.timeout_ms", self.translation.timeout_ms),
            ("generation.timeout_ms", self.generation.timeout_ms),
            ("synthesis.timeout_ms", self.synthesis.timeout_ms),
            ("retrieval.timeout_ms", self.retrieval.timeout_ms),
            ("messaging.timeout_ms", self.messaging.timeout_ms),
            ("telephony.download_timeout_ms", self.telephony.download_timeout_ms),
        ];

        for (field, value) in checks {
            if value < 100 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Timeout too low (minimum 100ms), got {}", value),
                });
            }
            if value > 120_000 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Timeout too high (maximum 120000ms), got {}", value),
                });
            }
        }

        Ok(())
    }

    fn validate_generation(&self) -> Result<(), ConfigError> {
        let generation = &self.generation;

        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "generation.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", generation.temperature),
            });
        }

        if generation.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.max_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        for code in &generation.capabilities {
            if Language::from_str_loose(code).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "generation.capabilities".to_string(),
                    message: format!("Unsupported language code '{}'", code),
                });
            }
        }

        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let retrieval = &self.retrieval;

        if retrieval.top_k == 0 || retrieval.top_k > 20 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.top_k".to_string(),
                message: format!("Must be between 1 and 20, got {}", retrieval.top_k),
            });
        }

        if !(0.0..=1.0).contains(&retrieval.min_score) {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.min_score".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", retrieval.min_score),
            });
        }

        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        let session = &self.session;

        if session.max_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_turns".to_string(),
                message: "A call must allow at least one turn".to_string(),
            });
        }

        if session.turn_deadline_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.turn_deadline_secs".to_string(),
                message: "Turn deadline must be at least 1 second".to_string(),
            });
        }

        if session.reaper_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.reaper_interval_secs".to_string(),
                message: "Reaper interval cannot be 0".to_string(),
            });
        }

        if session.idle_timeout_secs < session.reaper_interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "session.idle_timeout_secs".to_string(),
                message: "Idle timeout must not be shorter than the reaper interval".to_string(),
            });
        }

        Ok(())
    }

    /// Credentials may be absent in development; adapter calls then fail and
    /// turns end in the apology path
    fn validate_credentials(&self) -> Result<(), ConfigError> {
        let required = [
            ("transcription.api_key", &self.transcription.api_key),
            ("translation.api_key", &self.translation.api_key),
            ("generation.api_key", &self.generation.api_key),
            ("synthesis.api_key", &self.synthesis.api_key),
            ("telephony.account_sid", &self.telephony.account_sid),
            ("telephony.auth_token", &self.telephony.auth_token),
        ];

        for (field, value) in required {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(ConfigError::MissingField(field.to_string()));
            }
        }

        if self.messaging.enabled && self.messaging.from_number.is_none() {
            return Err(ConfigError::MissingField("messaging.from_number".to_string()));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_server_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5001
}
fn default_server_timeout() -> u64 {
    timeouts::SERVER_REQUEST_SECS
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_server_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Telephony webhooks (Twilio)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    #[serde(default = "default_twilio_sid")]
    pub account_sid: Option<String>,

    #[serde(default = "default_twilio_token")]
    pub auth_token: Option<String>,

    /// Externally reachable base URL used to build audio links; when unset
    /// the request's Host header is used
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Longest recording per turn (seconds)
    #[serde(default = "default_record_max_length")]
    pub record_max_length_secs: u32,

    /// Silence that ends a recording (seconds)
    #[serde(default = "default_record_silence_timeout")]
    pub record_silence_timeout_secs: u32,

    #[serde(default = "default_download_timeout")]
    pub download_timeout_ms: u64,

    /// Voice used for `<Say>` prompts
    #[serde(default = "default_say_voice")]
    pub say_voice: String,
}

fn default_twilio_sid() -> Option<String> {
    std::env::var("TWILIO_ACCOUNT_SID").ok()
}
fn default_twilio_token() -> Option<String> {
    std::env::var("TWILIO_AUTH_TOKEN").ok()
}
fn default_record_max_length() -> u32 {
    30
}
fn default_record_silence_timeout() -> u32 {
    3
}
fn default_download_timeout() -> u64 {
    timeouts::RECORDING_DOWNLOAD_MS
}
fn default_say_voice() -> String {
    "Polly.Aditi".to_string()
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: default_twilio_sid(),
            auth_token: default_twilio_token(),
            public_base_url: None,
            record_max_length_secs: default_record_max_length(),
            record_silence_timeout_secs: default_record_silence_timeout(),
            download_timeout_ms: default_download_timeout(),
            say_voice: default_say_voice(),
        }
    }
}

/// Speech-to-text service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_deepgram_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_deepgram_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_deepgram_model")]
    pub model: String,

    #[serde(default = "default_transcription_timeout")]
    pub timeout_ms: u64,
}

fn default_deepgram_endpoint() -> String {
    endpoints::DEEPGRAM_DEFAULT.to_string()
}
fn default_deepgram_key() -> Option<String> {
    std::env::var("DEEPGRAM_API_KEY").ok()
}
fn default_deepgram_model() -> String {
    "nova-2".to_string()
}
fn default_transcription_timeout() -> u64 {
    timeouts::TRANSCRIPTION_MS
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_deepgram_endpoint(),
            api_key: default_deepgram_key(),
            model: default_deepgram_model(),
            timeout_ms: default_transcription_timeout(),
        }
    }
}

/// Translation backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    /// Sarvam AI translate API
    #[default]
    Sarvam,
    /// Every cross-language request fails; the orchestrator's capability
    /// fallback decides what happens next
    Disabled,
}

/// Translation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub provider: TranslationProvider,

    #[serde(default = "default_sarvam_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_sarvam_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_translation_model")]
    pub model: String,

    #[serde(default = "default_translation_timeout")]
    pub timeout_ms: u64,
}

fn default_sarvam_endpoint() -> String {
    endpoints::SARVAM_DEFAULT.to_string()
}
fn default_sarvam_key() -> Option<String> {
    std::env::var("SARVAM_API_KEY").ok()
}
fn default_translation_model() -> String {
    "mayura:v1".to_string()
}
fn default_translation_timeout() -> u64 {
    timeouts::TRANSLATION_MS
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            endpoint: default_sarvam_endpoint(),
            api_key: default_sarvam_key(),
            model: default_translation_model(),
            timeout_ms: default_translation_timeout(),
        }
    }
}

/// Answer generation (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_groq_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_groq_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_ms: u64,

    /// Languages the model answers in directly, used when translating a
    /// question into the pivot language fails
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
}

fn default_groq_endpoint() -> String {
    endpoints::GROQ_DEFAULT.to_string()
}
fn default_groq_key() -> Option<String> {
    std::env::var("GROQ_API_KEY").ok()
}
fn default_generation_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    200
}
fn default_generation_timeout() -> u64 {
    timeouts::GENERATION_MS
}
fn default_capabilities() -> Vec<String> {
    vec!["en".to_string(), "hi".to_string()]
}

impl GenerationConfig {
    /// Parsed capability set; unknown codes are skipped
    pub fn capability_languages(&self) -> Vec<Language> {
        self.capabilities
            .iter()
            .filter_map(|c| Language::from_str_loose(c))
            .collect()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_groq_endpoint(),
            api_key: default_groq_key(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_generation_timeout(),
            capabilities: default_capabilities(),
        }
    }
}

/// Text-to-speech service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_google_tts_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_google_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f32,

    #[serde(default = "default_synthesis_timeout")]
    pub timeout_ms: u64,
}

fn default_google_tts_endpoint() -> String {
    endpoints::GOOGLE_TTS_DEFAULT.to_string()
}
fn default_google_key() -> Option<String> {
    std::env::var("GOOGLE_TTS_API_KEY").ok()
}
fn default_speaking_rate() -> f32 {
    0.95
}
fn default_synthesis_timeout() -> u64 {
    timeouts::SYNTHESIS_MS
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_google_tts_endpoint(),
            api_key: default_google_key(),
            speaking_rate: default_speaking_rate(),
            timeout_ms: default_synthesis_timeout(),
        }
    }
}

/// Retrieval backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalBackend {
    /// In-memory keyword index over a local corpus
    #[default]
    Keyword,
    /// Dense vectors in Qdrant
    Qdrant,
}

/// Context retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub backend: RetrievalBackend,

    /// Directory of `.txt`/`.md` files, or a JSON array file
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,

    #[serde(default = "default_qdrant_endpoint")]
    pub qdrant_endpoint: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_embedding_endpoint")]
    pub embedding_endpoint: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Snippets scoring below this are dropped
    #[serde(default)]
    pub min_score: f32,

    #[serde(default = "default_retrieval_timeout")]
    pub timeout_ms: u64,
}

fn default_corpus_path() -> String {
    "knowledge".to_string()
}
fn default_qdrant_endpoint() -> String {
    endpoints::QDRANT_DEFAULT.to_string()
}
fn default_collection() -> String {
    "agrow_knowledge".to_string()
}
fn default_embedding_endpoint() -> String {
    endpoints::OLLAMA_DEFAULT.to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_top_k() -> usize {
    policy::RETRIEVAL_TOP_K
}
fn default_retrieval_timeout() -> u64 {
    timeouts::RETRIEVAL_MS
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: RetrievalBackend::default(),
            corpus_path: default_corpus_path(),
            qdrant_endpoint: default_qdrant_endpoint(),
            collection: default_collection(),
            embedding_endpoint: default_embedding_endpoint(),
            embedding_model: default_embedding_model(),
            top_k: default_top_k(),
            min_score: 0.0,
            timeout_ms: default_retrieval_timeout(),
        }
    }
}

/// Summary delivery over WhatsApp (Twilio)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// When disabled, summaries are written to the log instead
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_twilio_endpoint")]
    pub endpoint: String,

    /// Sender number, with or without the `whatsapp:` prefix
    #[serde(default = "default_whatsapp_from")]
    pub from_number: Option<String>,

    #[serde(default = "default_messaging_timeout")]
    pub timeout_ms: u64,
}

fn default_twilio_endpoint() -> String {
    endpoints::TWILIO_DEFAULT.to_string()
}
fn default_whatsapp_from() -> Option<String> {
    std::env::var("TWILIO_WHATSAPP_FROM").ok()
}
fn default_messaging_timeout() -> u64 {
    timeouts::SUMMARY_DELIVERY_MS
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_twilio_endpoint(),
            from_number: default_whatsapp_from(),
            timeout_ms: default_messaging_timeout(),
        }
    }
}

/// Call limits and session housekeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default = "default_max_call_duration")]
    pub max_call_duration_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_closed_retention")]
    pub closed_retention_secs: u64,

    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,

    /// A turn still running after this long ends with the apology
    #[serde(default = "default_turn_deadline")]
    pub turn_deadline_secs: u64,
}

fn default_max_turns() -> usize {
    policy::MAX_TURNS_PER_CALL
}
fn default_max_call_duration() -> u64 {
    policy::MAX_CALL_DURATION_SECS
}
fn default_idle_timeout() -> u64 {
    policy::SESSION_IDLE_TIMEOUT_SECS
}
fn default_closed_retention() -> u64 {
    policy::CLOSED_SESSION_RETENTION_SECS
}
fn default_reaper_interval() -> u64 {
    30
}
fn default_turn_deadline() -> u64 {
    timeouts::TURN_DEADLINE_SECS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_call_duration_secs: default_max_call_duration(),
            idle_timeout_secs: default_idle_timeout(),
            closed_retention_secs: default_closed_retention(),
            reaper_interval_secs: default_reaper_interval(),
            turn_deadline_secs: default_turn_deadline(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Serve Prometheus metrics at `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/default`, `config/{env}` and `AGROW__*`
/// environment variables, in increasing precedence.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("AGROW")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
