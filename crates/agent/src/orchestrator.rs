//! Turn Orchestrator
//!
//! Drives one question/answer turn per recorded audio segment:
//!
//! ```text
//! Idle → Transcribing → ResolvingLanguage → TranslatingIn → Retrieving →
//! Generating → TranslatingOut → Synthesizing → Responding → Idle | Closing → Closed
//! ```
//!
//! Every adapter call runs under its own timeout, raced against the call's
//! cancellation token, with one retry for transient failures. Failed turns
//! answer with the apology cue and leave history untouched; closing a call
//! hands its history to the [`SummaryDispatcher`] in the background.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agrow_config::constants::{policy, timeouts};
use agrow_config::Settings;
use agrow_core::{
    AnswerGenerator, AudioClip, Error, Language, Result, Retriever, Snippet, SpeechSynthesizer,
    Transcriber, Translator, TurnRecord,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::task::TaskTracker;

use crate::cues::{Cue, CueKind, ResponseCues};
use crate::resolver::LanguageResolver;
use crate::session::{CallSession, CloseReason, SessionSlot, SessionStore, StatusSnapshot};
use crate::stage::PipelineStage;
use crate::summary::{DispatchRecord, SummaryDispatcher};

/// External capabilities a turn calls into
#[derive(Clone)]
pub struct Adapters {
    pub transcriber: Arc<dyn Transcriber>,
    pub translator: Arc<dyn Translator>,
    pub retriever: Arc<dyn Retriever>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub transcription_timeout: Duration,
    pub translation_timeout: Duration,
    pub retrieval_timeout: Duration,
    pub generation_timeout: Duration,
    pub synthesis_timeout: Duration,
    /// Retries after the first attempt of a transient failure
    pub retries: u32,
    pub retry_backoff: Duration,
    /// Whole-turn budget; keep it below the webhook request timeout
    pub turn_deadline: Duration,
    pub history_window: usize,
    pub top_k: usize,
    pub max_turns: usize,
    pub max_call_duration: Duration,
    pub idle_timeout: Duration,
    pub closed_retention: Duration,
    pub tombstone_retention: Duration,
    pub reaper_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            transcription_timeout: Duration::from_millis(timeouts::TRANSCRIPTION_MS),
            translation_timeout: Duration::from_millis(timeouts::TRANSLATION_MS),
            retrieval_timeout: Duration::from_millis(timeouts::RETRIEVAL_MS),
            generation_timeout: Duration::from_millis(timeouts::GENERATION_MS),
            synthesis_timeout: Duration::from_millis(timeouts::SYNTHESIS_MS),
            retries: policy::ADAPTER_RETRIES,
            retry_backoff: Duration::from_millis(policy::ADAPTER_RETRY_BACKOFF_MS),
            turn_deadline: Duration::from_secs(timeouts::TURN_DEADLINE_SECS),
            history_window: policy::HISTORY_WINDOW_TURNS,
            top_k: policy::RETRIEVAL_TOP_K,
            max_turns: policy::MAX_TURNS_PER_CALL,
            max_call_duration: Duration::from_secs(policy::MAX_CALL_DURATION_SECS),
            idle_timeout: Duration::from_secs(policy::SESSION_IDLE_TIMEOUT_SECS),
            closed_retention: Duration::from_secs(policy::CLOSED_SESSION_RETENTION_SECS),
            tombstone_retention: Duration::from_secs(policy::TOMBSTONE_RETENTION_SECS),
            reaper_interval: Duration::from_secs(10),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            transcription_timeout: Duration::from_millis(settings.transcription.timeout_ms),
            translation_timeout: Duration::from_millis(settings.translation.timeout_ms),
            retrieval_timeout: Duration::from_millis(settings.retrieval.timeout_ms),
            generation_timeout: Duration::from_millis(settings.generation.timeout_ms),
            synthesis_timeout: Duration::from_millis(settings.synthesis.timeout_ms),
            top_k: settings.retrieval.top_k,
            turn_deadline: Duration::from_secs(settings.session.turn_deadline_secs),
            max_turns: settings.session.max_turns,
            max_call_duration: Duration::from_secs(settings.session.max_call_duration_secs),
            idle_timeout: Duration::from_secs(settings.session.idle_timeout_secs),
            closed_retention: Duration::from_secs(settings.session.closed_retention_secs),
            reaper_interval: Duration::from_secs(settings.session.reaper_interval_secs),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TurnStatus {
    /// Answer recorded; `spoken` is false when the fallback cue played
    Answered { spoken: bool },
    /// Apology played, nothing recorded.
    ///
    /// The stage passes through `Responding` and settles on `Idle` once the
    /// apology is handed back; the failure stays readable in `last_error`
    /// and `status_detail`.
    Failed { kind: String },
}

/// What telephony plays back for one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    pub audio: AudioClip,
    /// Text behind `audio`
    pub spoken_text: String,
    pub language: Language,
    /// Present when the call closes after this response
    pub goodbye: Option<Cue>,
}

impl TurnOutcome {
    pub fn closes_call(&self) -> bool {
        self.goodbye.is_some()
    }
}

/// Opening of a new call
#[derive(Debug, Clone)]
pub struct CallGreeting {
    pub language: Language,
    pub cue: Cue,
    /// False when the call id was already known
    pub created: bool,
}

/// Result of one reaper pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapReport {
    pub idle_closed: Vec<String>,
    pub evicted: Vec<String>,
}

struct CompletedTurn {
    record: TurnRecord,
    audio: AudioClip,
    /// Degradations the caller did not hear about
    notes: Vec<String>,
}

pub struct TurnOrchestrator {
    adapters: Adapters,
    store: SessionStore,
    resolver: LanguageResolver,
    cues: ResponseCues,
    summaries: Arc<SummaryDispatcher>,
    tasks: TaskTracker,
    config: OrchestratorConfig,
}

impl TurnOrchestrator {
    pub fn new(
        adapters: Adapters,
        summaries: Arc<SummaryDispatcher>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            adapters,
            store: SessionStore::new(),
            resolver: LanguageResolver::new(),
            cues: ResponseCues::new(),
            summaries,
            tasks: TaskTracker::new(),
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn cues(&self) -> &ResponseCues {
        &self.cues
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.store
    }

    /// Render every cue in every served language. Best effort.
    pub async fn prerender_cues(&self) -> usize {
        self.cues
            .prerender(
                self.adapters.synthesizer.as_ref(),
                Language::all(),
                self.config.synthesis_timeout,
            )
            .await
    }

    /// Inbound call signal. Idempotent for a live call id.
    pub fn start_call(&self, call_id: &str, caller: &str) -> Result<CallGreeting> {
        let language = self.resolver.resolve(caller, None, None);
        let (slot, created) = self.store.open(call_id, caller, language)?;
        let language = slot.snapshot().language;
        if created {
            tracing::info!(call_id, language = %language, "Call started");
            metrics::counter!("agrow_calls_started_total").increment(1);
            slot.transition(PipelineStage::Idle, "waiting for audio");
        }
        Ok(CallGreeting {
            language,
            cue: self.cues.cue(CueKind::Greeting, language),
            created,
        })
    }

    /// Run one turn for a recorded segment.
    ///
    /// Segments for the same call queue on the call's turn gate.
    ///
    /// # Errors
    /// - `SessionClosed` / `SessionNotFound` when the call is not open
    /// - `Cancelled` when the call was terminated during the turn
    ///
    /// A turn running past `turn_deadline` is abandoned and answered with
    /// the apology like any other failed turn.
    pub async fn handle_audio(&self, call_id: &str, audio: AudioClip) -> Result<TurnOutcome> {
        let slot = self.store.get_open(call_id)?;
        slot.touch();
        let mut session = slot.lock().await;
        if session.is_closed() {
            return Err(Error::SessionClosed(call_id.to_string()));
        }
        if let Some(reason) = slot.termination_requested() {
            self.close_locked(&slot, &mut session, reason);
            return Err(Error::SessionClosed(call_id.to_string()));
        }

        let started = Instant::now();
        let deadline = self.config.turn_deadline;
        let result = tokio::time::timeout(deadline, self.run_turn(&slot, &mut session, &audio))
            .await
            .unwrap_or_else(|_| {
                let stage = slot.snapshot().stage;
                tracing::warn!(call_id, stage = %stage, "Turn deadline exceeded");
                Err(Error::TurnDeadlineExceeded(deadline.as_millis() as u64))
            });
        slot.touch();
        metrics::histogram!("agrow_turn_duration_seconds").record(started.elapsed().as_secs_f64());

        let mut outcome = match result {
            Ok(done) => self.complete_turn(&slot, &mut session, done),
            Err(Error::Cancelled) => {
                let reason = slot.termination_requested().unwrap_or(CloseReason::Hangup);
                tracing::info!(call_id, reason = reason.as_str(), "Turn abandoned, call terminated");
                metrics::counter!("agrow_turns_total", "outcome" => "cancelled").increment(1);
                self.close_locked(&slot, &mut session, reason);
                return Err(Error::Cancelled);
            }
            Err(e) => self.fail_turn(&slot, &mut session, e),
        };

        let limit = if session.history.len() >= self.config.max_turns {
            Some(CloseReason::TurnLimit)
        } else if slot.age() >= self.config.max_call_duration {
            Some(CloseReason::DurationLimit)
        } else {
            None
        };
        match slot.termination_requested().or(limit) {
            Some(reason) => {
                if limit.is_some() {
                    slot.request_termination(reason);
                }
                self.close_locked(&slot, &mut session, reason);
                outcome.goodbye = Some(self.cues.cue(CueKind::Goodbye, outcome.language));
            }
            None => {
                let detail = match &outcome.status {
                    TurnStatus::Answered { .. } => "waiting for audio".to_string(),
                    TurnStatus::Failed { kind } => format!("waiting for audio ({}: apology played)", kind),
                };
                slot.transition(PipelineStage::Idle, detail);
            }
        }
        Ok(outcome)
    }

    /// Termination signal (hangup, telephony status). Cancels any turn in
    /// flight and closes the call.
    pub async fn terminate(&self, call_id: &str, reason: CloseReason) -> Result<()> {
        let slot = self.store.get(call_id)?;
        if slot.is_closed() {
            return Err(Error::SessionClosed(call_id.to_string()));
        }
        if slot.request_termination(reason) {
            tracing::info!(call_id, reason = reason.as_str(), "Termination requested");
        }
        let mut session = slot.lock().await;
        self.close_locked(&slot, &mut session, reason);
        Ok(())
    }

    pub fn status(&self, call_id: &str) -> Result<StatusSnapshot> {
        self.store.get(call_id).map(|slot| slot.snapshot())
    }

    pub fn statuses(&self) -> Vec<StatusSnapshot> {
        self.store.snapshots()
    }

    pub fn summary_outcome(&self, call_id: &str) -> Option<DispatchRecord> {
        self.summaries.outcome(call_id)
    }

    /// Wait for every background summary dispatch started so far
    pub async fn flush_summaries(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Close every open call and wait for their summaries
    pub async fn shutdown(&self) {
        let open: Vec<_> = self
            .store
            .slots()
            .into_iter()
            .filter(|slot| !slot.is_closed())
            .collect();
        tracing::info!(open = open.len(), "Closing open calls for shutdown");
        for slot in open {
            if let Err(e) = self.terminate(slot.call_id(), CloseReason::Shutdown).await {
                tracing::debug!(call_id = slot.call_id(), error = %e, "Call already closed");
            }
        }
        self.flush_summaries().await;
    }

    /// Close idle calls and evict long-closed ones
    pub fn reap(&self) -> ReapReport {
        let mut report = ReapReport::default();
        for slot in self.store.slots() {
            if slot.is_closed() || slot.idle_for() < self.config.idle_timeout {
                continue;
            }
            // A call mid-turn is not idle
            let Some(mut session) = slot.try_lock() else {
                continue;
            };
            slot.request_termination(CloseReason::IdleTimeout);
            self.close_locked(&slot, &mut session, CloseReason::IdleTimeout);
            report.idle_closed.push(slot.call_id().to_string());
        }
        report.evicted = self.store.evict_closed(self.config.closed_retention);
        self.store.purge_tombstones(self.config.tombstone_retention);
        report
    }

    /// Run [`reap`](Self::reap) every `reaper_interval` until the returned
    /// sender sends `true`. `on_evict` sees the ids of evicted calls.
    pub fn start_reaper<F>(self: &Arc<Self>, on_evict: F) -> watch::Sender<bool>
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let orchestrator = Arc::clone(self);
        let period = orchestrator.config.reaper_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = orchestrator.reap();
                        if !report.idle_closed.is_empty() || !report.evicted.is_empty() {
                            tracing::info!(
                                idle_closed = report.idle_closed.len(),
                                evicted = report.evicted.len(),
                                remaining = orchestrator.store.len(),
                                "Session reaper pass"
                            );
                        }
                        if !report.evicted.is_empty() {
                            on_evict(&report.evicted);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session reaper shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    async fn run_turn(
        &self,
        slot: &SessionSlot,
        session: &mut CallSession,
        audio: &AudioClip,
    ) -> Result<CompletedTurn> {
        let mut notes = Vec::new();

        slot.transition(PipelineStage::Transcribing, "transcribing audio");
        if audio.is_empty() {
            return Err(Error::EmptyAudio);
        }
        let transcriber = &self.adapters.transcriber;
        let transcription = self
            .invoke(slot, PipelineStage::Transcribing, self.config.transcription_timeout, move || {
                transcriber.transcribe(audio)
            })
            .await?;
        let question = transcription.text.trim().to_string();
        if question.is_empty() {
            return Err(Error::EmptyAudio);
        }

        slot.transition(PipelineStage::ResolvingLanguage, "resolving language");
        let previous = session.resolved_language;
        let detection = self.resolver.detect(&transcription);
        let language = self.resolver.resolve(slot.caller(), Some(previous), detection);
        session.resolved_language = language;
        slot.update_status(|s| {
            s.language = language;
            s.last_question = Some(question.clone());
        });

        let pivot = Language::English;
        slot.transition(
            PipelineStage::TranslatingIn,
            format!("translating question {} → {}", language.code(), pivot.code()),
        );
        let translator = &self.adapters.translator;
        let q = question.as_str();
        let translated_in = self
            .invoke(slot, PipelineStage::TranslatingIn, self.config.translation_timeout, move || {
                translator.translate(q, language, pivot)
            })
            .await;
        let (model_question, model_language) = match translated_in {
            Ok(text) => (text, pivot),
            Err(e) if e != Error::Cancelled && self.adapters.generator.supports_language(language) => {
                tracing::warn!(call_id = slot.call_id(), error = %e, language = %language, "Answering without translation");
                notes.push(format!("{}: answered in {} directly", e.kind(), language.code()));
                (question.clone(), language)
            }
            Err(e) => return Err(e),
        };

        slot.transition(PipelineStage::Retrieving, "searching knowledge base");
        let retriever = &self.adapters.retriever;
        let query = model_question.as_str();
        let top_k = self.config.top_k;
        let snippets: Vec<Snippet> = match self
            .invoke(slot, PipelineStage::Retrieving, self.config.retrieval_timeout, move || {
                retriever.retrieve(query, top_k)
            })
            .await
        {
            Ok(found) => found,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                tracing::warn!(call_id = slot.call_id(), error = %e, "Retrieval failed, answering without context");
                notes.push(format!("{}: answered without context", e.kind()));
                Vec::new()
            }
        };

        slot.transition(
            PipelineStage::Generating,
            format!("generating answer from {} snippets", snippets.len()),
        );
        let history = session.recent_history(self.config.history_window);
        let generator = &self.adapters.generator;
        let (context, past) = (snippets.as_slice(), history.as_slice());
        let model_answer = self
            .invoke(slot, PipelineStage::Generating, self.config.generation_timeout, move || {
                generator.generate(query, model_language, context, past)
            })
            .await?;

        slot.transition(
            PipelineStage::TranslatingOut,
            format!("translating answer {} → {}", model_language.code(), language.code()),
        );
        let a = model_answer.as_str();
        let answer = self
            .invoke(slot, PipelineStage::TranslatingOut, self.config.translation_timeout, move || {
                translator.translate(a, model_language, language)
            })
            .await?;

        slot.transition(PipelineStage::Synthesizing, "synthesizing answer");
        let synthesizer = &self.adapters.synthesizer;
        let spoken_answer = answer.as_str();
        let synthesized = self
            .invoke(slot, PipelineStage::Synthesizing, self.config.synthesis_timeout, move || {
                synthesizer.synthesize(spoken_answer, language)
            })
            .await
            .and_then(|clip| {
                if clip.is_empty() {
                    Err(Error::SynthesisUnavailable("synthesizer returned no audio".into()))
                } else {
                    Ok(clip)
                }
            });
        let (audio, spoken) = match synthesized {
            Ok(clip) => (clip, true),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                tracing::warn!(call_id = slot.call_id(), error = %e, "Playing unable-to-speak cue");
                notes.push(format!("{}: answer not spoken", e.kind()));
                (self.cues.audio_or_tone(CueKind::UnableToSpeak, language), false)
            }
        };

        Ok(CompletedTurn {
            record: TurnRecord {
                question_text: question,
                answer_text: answer,
                question_pivot: model_question,
                answer_pivot: model_answer,
                language,
                timestamp: Utc::now(),
                spoken,
            },
            audio,
            notes,
        })
    }

    fn complete_turn(
        &self,
        slot: &SessionSlot,
        session: &mut CallSession,
        done: CompletedTurn,
    ) -> TurnOutcome {
        let CompletedTurn { record, audio, notes } = done;
        let spoken = record.spoken;
        let language = record.language;
        let spoken_text = if spoken {
            record.answer_text.clone()
        } else {
            self.cues.cue(CueKind::UnableToSpeak, language).text.to_string()
        };

        let detail = if notes.is_empty() {
            "answer ready".to_string()
        } else {
            format!("answer ready; {}", notes.join("; "))
        };
        let last_error = notes
            .first()
            .and_then(|n| n.split(':').next())
            .map(str::to_string);

        slot.update_status(|s| {
            s.stage = PipelineStage::Responding;
            s.status_detail = detail;
            s.language = language;
            s.last_question = Some(record.question_text.clone());
            s.last_answer = Some(record.answer_text.clone());
            s.last_error = last_error;
            s.turn_count = session.history.len() + 1;
        });
        session.history.push(record);

        tracing::info!(
            call_id = slot.call_id(),
            turn = session.history.len(),
            language = %language,
            spoken,
            "Turn answered"
        );
        metrics::counter!("agrow_turns_total", "outcome" => "answered").increment(1);

        TurnOutcome {
            status: TurnStatus::Answered { spoken },
            audio,
            spoken_text,
            language,
            goodbye: None,
        }
    }

    fn fail_turn(&self, slot: &SessionSlot, session: &mut CallSession, error: Error) -> TurnOutcome {
        session.failed_turns += 1;
        let language = session.resolved_language;
        let kind = error.kind();
        tracing::warn!(call_id = slot.call_id(), kind, error = %error, "Turn failed");
        metrics::counter!("agrow_turns_total", "outcome" => "failed", "kind" => kind).increment(1);

        let failed_turns = session.failed_turns;
        slot.update_status(|s| {
            s.stage = PipelineStage::Responding;
            s.status_detail = format!("{}: apology played", kind);
            s.language = language;
            s.last_error = Some(kind.to_string());
            s.failed_turns = failed_turns;
        });

        let apology = self.cues.cue(CueKind::Apology, language);
        TurnOutcome {
            status: TurnStatus::Failed {
                kind: kind.to_string(),
            },
            audio: self.cues.audio_or_tone(CueKind::Apology, language),
            spoken_text: apology.text.to_string(),
            language,
            goodbye: None,
        }
    }

    /// Closing → Closed; the caller holds the turn gate
    fn close_locked(&self, slot: &SessionSlot, session: &mut CallSession, reason: CloseReason) {
        if session.is_closed() {
            return;
        }
        slot.transition(PipelineStage::Closing, format!("closing: {}", reason.as_str()));
        slot.mark_closed(session, reason);
        slot.cancellation().cancel();

        let dispatcher = Arc::clone(&self.summaries);
        let call_id = slot.call_id().to_string();
        let caller = slot.caller().to_string();
        let history = session.history.clone();
        let language = session.resolved_language;
        self.tasks.spawn(async move {
            dispatcher.dispatch(&call_id, &caller, &history, language).await;
        });

        tracing::info!(
            call_id = slot.call_id(),
            reason = reason.as_str(),
            turns = session.history.len(),
            failed_turns = session.failed_turns,
            "Call closed"
        );
        metrics::counter!("agrow_calls_closed_total", "reason" => reason.as_str()).increment(1);
        slot.transition(PipelineStage::Closed, format!("closed: {}", reason.as_str()));
    }

    /// Call an adapter under `limit`, racing the call's cancellation, with
    /// bounded retries for transient failures
    async fn invoke<T, F, Fut>(
        &self,
        slot: &SessionSlot,
        stage: PipelineStage,
        limit: Duration,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cancel = slot.cancellation();
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                r = tokio::time::timeout(limit, call()) => {
                    r.unwrap_or_else(|_| Err(stage.timeout_error(limit.as_millis())))
                }
            };
            metrics::histogram!("agrow_stage_duration_seconds", "stage" => stage.as_str())
                .record(started.elapsed().as_secs_f64());

            match result {
                Err(e) if e.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    tracing::warn!(
                        call_id = slot.call_id(),
                        stage = %stage,
                        attempt,
                        error = %e,
                        "Retrying adapter call"
                    );
                    metrics::counter!("agrow_adapter_retries_total", "stage" => stage.as_str())
                        .increment(1);
                    slot.update_status(|s| s.status_detail = format!("{}: retrying", e.kind()));
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(self.config.retry_backoff) => {}
                    }
                }
                other => return other,
            }
        }
    }
}
