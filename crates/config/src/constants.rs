//! Centralized constants for the helpline
//!
//! Policy values the orchestrator depends on live here, and only here, so
//! that thresholds and window sizes are never scattered across call sites.

/// Turn and session policy
pub mod policy {
    /// A detected language replaces the session language only at or above
    /// this transcription confidence.
    pub const LANGUAGE_SWITCH_CONFIDENCE: f32 = 0.80;

    /// Confidence assigned to a language inferred from the transcript's
    /// script when the recognizer reported no language tag.
    pub const SCRIPT_DETECTION_CONFIDENCE: f32 = 0.85;

    /// Script detection needs strictly more than this many characters
    pub const SCRIPT_DETECTION_MIN_CHARS: usize = 5;

    /// Language used when the caller's number matches no prefix
    pub const DEFAULT_LANGUAGE: &str = "hi";

    /// Most recent turns passed to the answer generator
    pub const HISTORY_WINDOW_TURNS: usize = 3;

    /// Sentences kept from a generated answer
    pub const MAX_ANSWER_SENTENCES: usize = 3;

    /// Snippets requested from the retriever per question
    pub const RETRIEVAL_TOP_K: usize = 3;

    /// Retries after the first attempt for a transient adapter failure
    pub const ADAPTER_RETRIES: u32 = 1;

    /// Delay before an adapter retry (ms)
    pub const ADAPTER_RETRY_BACKOFF_MS: u64 = 250;

    /// Calls close after this many completed turns
    pub const MAX_TURNS_PER_CALL: usize = 10;

    /// Calls close once they have lasted this long (seconds)
    pub const MAX_CALL_DURATION_SECS: u64 = 600;

    /// Sessions with no audio for this long are closed (seconds)
    pub const SESSION_IDLE_TIMEOUT_SECS: u64 = 120;

    /// Closed sessions are evicted after this long (seconds)
    pub const CLOSED_SESSION_RETENTION_SECS: u64 = 600;

    /// Ids of evicted sessions are remembered this long so a late signal
    /// still gets `SessionClosed` (seconds)
    pub const TOMBSTONE_RETENTION_SECS: u64 = 86_400;

    /// Attempts to deliver a call summary, first one included
    pub const SUMMARY_DELIVERY_ATTEMPTS: u32 = 3;

    /// Initial delay between summary delivery attempts, doubled each time (ms)
    pub const SUMMARY_BACKOFF_MS: u64 = 500;

    /// Question and answer text in a summary bullet is cut to this many chars
    pub const SUMMARY_ITEM_CHARS: usize = 280;

    /// WAV recordings quieter than this RMS (on a 0..1 scale) are silence
    pub const SILENCE_RMS_FLOOR: f32 = 0.01;
}

/// Per-adapter timeouts (ms)
pub mod timeouts {
    pub const TRANSCRIPTION_MS: u64 = 10_000;

    pub const TRANSLATION_MS: u64 = 8_000;

    pub const RETRIEVAL_MS: u64 = 5_000;

    pub const GENERATION_MS: u64 = 20_000;

    pub const SYNTHESIS_MS: u64 = 15_000;

    pub const SUMMARY_DELIVERY_MS: u64 = 10_000;

    /// Fetching a recording from the telephony provider
    pub const RECORDING_DOWNLOAD_MS: u64 = 30_000;

    /// Whole-turn deadline (seconds). A turn past it ends with the apology,
    /// so it must fit inside the webhook timeout together with the recording
    /// download.
    pub const TURN_DEADLINE_SECS: u64 = 55;

    /// HTTP request timeout for inbound webhooks (seconds)
    pub const SERVER_REQUEST_SECS: u64 = 90;
}

/// Service endpoints
pub mod endpoints {
    pub const DEEPGRAM_DEFAULT: &str = "https://api.deepgram.com";

    pub const SARVAM_DEFAULT: &str = "https://api.sarvam.ai";

    /// OpenAI-compatible chat completions (Groq)
    pub const GROQ_DEFAULT: &str = "https://api.groq.com/openai/v1";

    pub const GOOGLE_TTS_DEFAULT: &str = "https://texttospeech.googleapis.com";

    pub const TWILIO_DEFAULT: &str = "https://api.twilio.com";

    /// Ollama embedding endpoint
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";

    /// Qdrant vector store endpoint
    pub const QDRANT_DEFAULT: &str = "http://127.0.0.1:6334";
}

/// Caller-number prefixes mapped to the language most likely spoken there.
///
/// Indian landline numbers carry an STD code after `+91`; the table maps the
/// major agricultural regions' codes. Matching is longest-prefix first.
pub mod language_prefixes {
    pub const PREFIXES: &[(&str, &str)] = &[
        // Tamil Nadu
        ("+9144", "ta"),
        ("+91422", "ta"),
        ("+91452", "ta"),
        ("+91431", "ta"),
        // Telangana / Andhra Pradesh
        ("+9140", "te"),
        ("+91866", "te"),
        ("+91891", "te"),
        // Karnataka
        ("+9180", "kn"),
        ("+91821", "kn"),
        ("+91836", "kn"),
        // Kerala
        ("+91471", "ml"),
        ("+91484", "ml"),
        ("+91495", "ml"),
        // West Bengal
        ("+9133", "bn"),
        ("+91353", "bn"),
        // Maharashtra
        ("+9122", "mr"),
        ("+9120", "mr"),
        ("+91712", "mr"),
        ("+91253", "mr"),
        // Gujarat
        ("+9179", "gu"),
        ("+91261", "gu"),
        ("+91265", "gu"),
        // Punjab
        ("+91161", "pa"),
        ("+91172", "pa"),
        ("+91183", "pa"),
        // Odisha
        ("+91674", "or"),
        ("+91671", "or"),
        // Hindi belt
        ("+9111", "hi"),
        ("+91141", "hi"),
        ("+91522", "hi"),
        ("+91755", "hi"),
        ("+91612", "hi"),
        // International callers
        ("+1", "en"),
        ("+44", "en"),
        ("+61", "en"),
    ];
}
