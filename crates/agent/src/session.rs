//! Session Store
//!
//! One [`SessionSlot`] per `call_id`, held in a sharded map so unrelated
//! calls never contend on a shared lock. Each slot carries:
//! - a turn gate (`tokio::sync::Mutex<CallSession>`) held for a whole turn
//! - a cancellation token fired by termination signals
//! - a live [`StatusSnapshot`] replaced whole on every transition
//!
//! Closed sessions stay readable until evicted; evicted ids leave a
//! tombstone so a late signal is still rejected with `SessionClosed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use agrow_core::{Error, HistoryTurn, Language, Result, TurnRecord};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as TurnGate, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::stage::PipelineStage;

/// Why a call was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Telephony reported the call ended, or an explicit hangup
    Hangup,
    TurnLimit,
    DurationLimit,
    IdleTimeout,
    Shutdown,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hangup => "hangup",
            Self::TurnLimit => "turn_limit",
            Self::DurationLimit => "duration_limit",
            Self::IdleTimeout => "idle_timeout",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Read-only projection served to monitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub call_id: String,
    pub caller: String,
    pub stage: PipelineStage,
    pub status_detail: String,
    pub language: Language,
    pub last_question: Option<String>,
    pub last_answer: Option<String>,
    /// Error kind of the most recent failed turn or degraded stage
    pub last_error: Option<String>,
    pub turn_count: usize,
    pub failed_turns: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable call state, reachable only through the turn gate
#[derive(Debug)]
pub struct CallSession {
    pub resolved_language: Language,
    pub history: Vec<TurnRecord>,
    pub failed_turns: u32,
    close_reason: Option<CloseReason>,
}

impl CallSession {
    fn new(language: Language) -> Self {
        Self {
            resolved_language: language,
            history: Vec::new(),
            failed_turns: 0,
            close_reason: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.close_reason.is_some()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// The last `window` completed turns, oldest first
    pub fn recent_history(&self, window: usize) -> Vec<HistoryTurn> {
        let skip = self.history.len().saturating_sub(window);
        self.history[skip..].iter().map(HistoryTurn::from).collect()
    }
}

#[derive(Debug)]
pub struct SessionSlot {
    call_id: String,
    caller: String,
    started_at: Instant,
    gate: TurnGate<CallSession>,
    cancel: CancellationToken,
    termination: Mutex<Option<CloseReason>>,
    status: RwLock<StatusSnapshot>,
    last_activity: Mutex<Instant>,
    closed: AtomicBool,
    closed_at: Mutex<Option<Instant>>,
}

impl SessionSlot {
    fn new(call_id: &str, caller: &str, language: Language) -> Self {
        let now = Utc::now();
        Self {
            call_id: call_id.to_string(),
            caller: caller.to_string(),
            started_at: Instant::now(),
            gate: TurnGate::new(CallSession::new(language)),
            cancel: CancellationToken::new(),
            termination: Mutex::new(None),
            status: RwLock::new(StatusSnapshot {
                call_id: call_id.to_string(),
                caller: caller.to_string(),
                stage: PipelineStage::Idle,
                status_detail: "call started".to_string(),
                language,
                last_question: None,
                last_answer: None,
                last_error: None,
                turn_count: 0,
                failed_turns: 0,
                started_at: now,
                updated_at: now,
            }),
            last_activity: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
            closed_at: Mutex::new(None),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    /// Wait for the turn gate
    pub async fn lock(&self) -> MutexGuard<'_, CallSession> {
        self.gate.lock().await
    }

    /// Take the turn gate only if no turn is running
    pub fn try_lock(&self) -> Option<MutexGuard<'_, CallSession>> {
        self.gate.try_lock().ok()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Record a termination request and cancel in-flight work.
    ///
    /// The first reason sticks; returns false for repeats.
    pub fn request_termination(&self, reason: CloseReason) -> bool {
        let first = {
            let mut termination = self.termination.lock();
            if termination.is_some() {
                false
            } else {
                *termination = Some(reason);
                true
            }
        };
        self.cancel.cancel();
        first
    }

    pub fn termination_requested(&self) -> Option<CloseReason> {
        *self.termination.lock()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.status.read().clone()
    }

    /// Replace the status snapshot with an edited copy
    pub fn update_status(&self, edit: impl FnOnce(&mut StatusSnapshot)) {
        let mut guard = self.status.write();
        let mut next = guard.clone();
        edit(&mut next);
        next.updated_at = Utc::now();
        *guard = next;
    }

    /// Move to `stage` and publish `detail`
    pub fn transition(&self, stage: PipelineStage, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::debug!(call_id = %self.call_id, stage = %stage, detail = %detail, "Stage transition");
        self.update_status(|s| {
            s.stage = stage;
            s.status_detail = detail;
        });
    }

    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the slot closed; requires the turn gate so history is final
    pub(crate) fn mark_closed(&self, session: &mut CallSession, reason: CloseReason) {
        session.close_reason = Some(reason);
        *self.closed_at.lock() = Some(Instant::now());
        self.closed.store(true, Ordering::Release);
    }

    fn closed_for(&self) -> Option<Duration> {
        self.closed_at.lock().map(|at| at.elapsed())
    }
}

/// Arena of call sessions keyed by `call_id`
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionSlot>>,
    tombstones: DashMap<String, Instant>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the session for `call_id`, or return the live one.
    ///
    /// The boolean is true when this call created it. Closed or evicted
    /// sessions are never reopened.
    pub fn open(
        &self,
        call_id: &str,
        caller: &str,
        language: Language,
    ) -> Result<(Arc<SessionSlot>, bool)> {
        if self.tombstones.contains_key(call_id) {
            return Err(Error::SessionClosed(call_id.to_string()));
        }
        match self.sessions.entry(call_id.to_string()) {
            Entry::Occupied(entry) => {
                let slot = Arc::clone(entry.get());
                if slot.is_closed() {
                    Err(Error::SessionClosed(call_id.to_string()))
                } else {
                    Ok((slot, false))
                }
            }
            Entry::Vacant(entry) => {
                let slot = Arc::new(SessionSlot::new(call_id, caller, language));
                entry.insert(Arc::clone(&slot));
                Ok((slot, true))
            }
        }
    }

    /// Live or closed-but-retained session
    pub fn get(&self, call_id: &str) -> Result<Arc<SessionSlot>> {
        if let Some(slot) = self.sessions.get(call_id) {
            return Ok(Arc::clone(slot.value()));
        }
        if self.tombstones.contains_key(call_id) {
            Err(Error::SessionClosed(call_id.to_string()))
        } else {
            Err(Error::SessionNotFound(call_id.to_string()))
        }
    }

    /// Session accepting new work
    pub fn get_open(&self, call_id: &str) -> Result<Arc<SessionSlot>> {
        let slot = self.get(call_id)?;
        if slot.is_closed() {
            return Err(Error::SessionClosed(call_id.to_string()));
        }
        Ok(slot)
    }

    pub fn slots(&self) -> Vec<Arc<SessionSlot>> {
        self.sessions.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// All retained snapshots, ordered by call id
    pub fn snapshots(&self) -> Vec<StatusSnapshot> {
        let mut all: Vec<_> = self.sessions.iter().map(|e| e.value().snapshot()).collect();
        all.sort_by(|a, b| a.call_id.cmp(&b.call_id));
        all
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.iter().filter(|e| !e.value().is_closed()).count()
    }

    /// Drop sessions closed for at least `retention`, leaving tombstones.
    /// Returns the evicted call ids.
    pub fn evict_closed(&self, retention: Duration) -> Vec<String> {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| e.value().closed_for().is_some_and(|d| d >= retention))
            .map(|e| e.key().clone())
            .collect();

        for call_id in &expired {
            self.tombstones.insert(call_id.clone(), Instant::now());
            self.sessions.remove(call_id);
        }
        expired
    }

    /// Forget tombstones older than `retention`
    pub fn purge_tombstones(&self, retention: Duration) {
        self.tombstones.retain(|_, at| at.elapsed() < retention);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_is_idempotent() {
        let store = SessionStore::new();
        let (a, created_a) = store.open("CA1", "+911112345678", Language::Hindi).unwrap();
        let (b, created_b) = store.open("CA1", "+911112345678", Language::Tamil).unwrap();
        assert!(created_a);
        assert!(!created_b);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.snapshot().language, Language::Hindi);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_session_is_never_reopened() {
        let store = SessionStore::new();
        let (slot, _) = store.open("CA1", "+91", Language::Hindi).unwrap();
        {
            let mut session = slot.lock().await;
            slot.mark_closed(&mut session, CloseReason::Hangup);
        }
        assert_eq!(
            store.open("CA1", "+91", Language::Hindi).unwrap_err(),
            Error::SessionClosed("CA1".into())
        );
        assert!(store.get_open("CA1").is_err());
        assert!(store.get("CA1").is_ok());

        let evicted = store.evict_closed(Duration::ZERO);
        assert_eq!(evicted, vec!["CA1".to_string()]);
        assert_eq!(
            store.get("CA1").unwrap_err(),
            Error::SessionClosed("CA1".into())
        );
        assert!(store.open("CA1", "+91", Language::Hindi).is_err());
    }

    #[test]
    fn test_unknown_call_is_not_found() {
        let store = SessionStore::new();
        assert_eq!(
            store.get("nope").unwrap_err(),
            Error::SessionNotFound("nope".into())
        );
    }

    #[test]
    fn test_status_transition_replaces_snapshot() {
        let store = SessionStore::new();
        let (slot, _) = store.open("CA1", "+91", Language::Hindi).unwrap();
        let before = slot.snapshot();
        slot.transition(PipelineStage::Transcribing, "transcribing audio");
        let after = slot.snapshot();
        assert_eq!(after.stage, PipelineStage::Transcribing);
        assert_eq!(after.status_detail, "transcribing audio");
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(before.stage, PipelineStage::Idle);
    }

    #[test]
    fn test_first_termination_reason_wins() {
        let store = SessionStore::new();
        let (slot, _) = store.open("CA1", "+91", Language::Hindi).unwrap();
        assert!(slot.request_termination(CloseReason::Hangup));
        assert!(!slot.request_termination(CloseReason::IdleTimeout));
        assert_eq!(slot.termination_requested(), Some(CloseReason::Hangup));
        assert!(slot.cancellation().is_cancelled());
    }

    #[tokio::test]
    async fn test_recent_history_window() {
        let store = SessionStore::new();
        let (slot, _) = store.open("CA1", "+91", Language::English).unwrap();
        let mut session = slot.lock().await;
        for i in 0..5 {
            session.history.push(TurnRecord {
                question_text: format!("q{i}"),
                answer_text: format!("a{i}"),
                question_pivot: format!("q{i}"),
                answer_pivot: format!("a{i}"),
                language: Language::English,
                timestamp: Utc::now(),
                spoken: true,
            });
        }
        let recent = session.recent_history(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].question, "q2");
        assert_eq!(recent[2].answer, "a4");
    }

    #[tokio::test]
    async fn test_try_lock_fails_during_turn() {
        let store = SessionStore::new();
        let (slot, _) = store.open("CA1", "+91", Language::Hindi).unwrap();
        let _turn = slot.lock().await;
        assert!(slot.try_lock().is_none());
    }

    #[test]
    fn test_snapshots_sorted() {
        let store = SessionStore::new();
        store.open("CB", "+91", Language::Hindi).unwrap();
        store.open("CA", "+91", Language::Hindi).unwrap();
        let ids: Vec<_> = store.snapshots().into_iter().map(|s| s.call_id).collect();
        assert_eq!(ids, vec!["CA", "CB"]);
    }
}
