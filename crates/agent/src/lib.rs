//! Call handling for the Agrow helpline
//!
//! Features:
//! - Turn orchestration over pluggable speech, translation, retrieval and
//!   generation adapters
//! - Per-call sessions with a turn gate, cancellation and live status
//! - Caller language resolution from number prefix, recognizer tag or script
//! - Pre-rendered spoken cues (greeting, apology, goodbye)
//! - Post-call summary dispatch over a messaging channel

pub mod cues;
pub mod orchestrator;
pub mod resolver;
pub mod session;
pub mod stage;
pub mod summary;

pub use cues::{cue_text, Cue, CueKind, ResponseCues};
pub use orchestrator::{
    Adapters, CallGreeting, OrchestratorConfig, ReapReport, TurnOrchestrator, TurnOutcome,
    TurnStatus,
};
pub use resolver::{LanguageDetection, LanguageResolver};
pub use session::{CallSession, CloseReason, SessionSlot, SessionStore, StatusSnapshot};
pub use stage::PipelineStage;
pub use summary::{DispatchRecord, DispatchStatus, SummaryConfig, SummaryDispatcher};
