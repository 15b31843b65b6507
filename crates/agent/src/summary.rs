//! Summary Dispatcher
//!
//! After a call closes, the caller receives a short text summary of every
//! answered question over the messaging channel. Dispatch happens at most
//! once per call; the ledger keeps the outcome queryable afterwards.

use std::sync::Arc;
use std::time::Duration;

use agrow_config::constants::{policy, timeouts};
use agrow_config::Settings;
use agrow_core::{Error, Language, MessageChannel, TurnRecord, Translator};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

const HEADER: &str = "Agrow helpline: summary of your call";
const NOTHING_ANSWERED: &str = "No questions were answered during this call.";
const NOT_SPOKEN: &str = "(could not be spoken on the call)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DispatchStatus {
    Pending,
    Delivered { message_id: Option<String> },
    Failed { reason: String },
}

/// Ledger entry for one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub call_id: String,
    pub status: DispatchStatus,
    /// Delivery attempts made so far
    pub attempts: u32,
    /// Language the summary was sent in
    pub language: Language,
    pub text: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub delivery_timeout: Duration,
    pub translation_timeout: Duration,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            attempts: policy::SUMMARY_DELIVERY_ATTEMPTS,
            initial_backoff: Duration::from_millis(policy::SUMMARY_BACKOFF_MS),
            delivery_timeout: Duration::from_millis(timeouts::SUMMARY_DELIVERY_MS),
            translation_timeout: Duration::from_millis(timeouts::TRANSLATION_MS),
        }
    }
}

impl SummaryConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            delivery_timeout: Duration::from_millis(settings.messaging.timeout_ms),
            translation_timeout: Duration::from_millis(settings.translation.timeout_ms),
            ..Self::default()
        }
    }
}

pub struct SummaryDispatcher {
    channel: Arc<dyn MessageChannel>,
    translator: Arc<dyn Translator>,
    ledger: DashMap<String, DispatchRecord>,
    config: SummaryConfig,
}

impl SummaryDispatcher {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        translator: Arc<dyn Translator>,
        config: SummaryConfig,
    ) -> Self {
        Self {
            channel,
            translator,
            ledger: DashMap::new(),
            config,
        }
    }

    /// Render the English summary of `history`
    pub fn compose(history: &[TurnRecord]) -> String {
        if history.is_empty() {
            return format!("{}\n{}", HEADER, NOTHING_ANSWERED);
        }
        let mut text = String::from(HEADER);
        for turn in history {
            text.push_str("\n• Q: ");
            text.push_str(&truncate_chars(&turn.question_pivot, policy::SUMMARY_ITEM_CHARS));
            text.push_str("\n  A: ");
            text.push_str(&truncate_chars(&turn.answer_pivot, policy::SUMMARY_ITEM_CHARS));
            if !turn.spoken {
                text.push(' ');
                text.push_str(NOT_SPOKEN);
            }
        }
        text
    }

    /// Summary in the caller's language, English if translation fails.
    ///
    /// Returns the text and the language it is written in.
    pub async fn summarize(&self, history: &[TurnRecord], language: Language) -> (String, Language) {
        let english = Self::compose(history);
        if language.is_pivot() {
            return (english, language);
        }
        let translated = tokio::time::timeout(
            self.config.translation_timeout,
            self.translator.translate(&english, Language::English, language),
        )
        .await;
        match translated {
            Ok(Ok(text)) if !text.trim().is_empty() => (text, language),
            Ok(Ok(_)) => {
                tracing::warn!(language = %language, "Summary translation came back blank, sending English");
                (english, Language::English)
            }
            Ok(Err(e)) => {
                tracing::warn!(language = %language, error = %e, "Summary translation failed, sending English");
                (english, Language::English)
            }
            Err(_) => {
                tracing::warn!(language = %language, "Summary translation timed out, sending English");
                (english, Language::English)
            }
        }
    }

    /// Summarize and deliver once per `call_id`.
    ///
    /// A second trigger for the same call sends nothing and returns the
    /// existing ledger entry.
    pub async fn dispatch(
        &self,
        call_id: &str,
        recipient: &str,
        history: &[TurnRecord],
        language: Language,
    ) -> DispatchRecord {
        match self.ledger.entry(call_id.to_string()) {
            Entry::Occupied(existing) => {
                tracing::debug!(call_id, "Summary already dispatched");
                return existing.get().clone();
            }
            Entry::Vacant(slot) => {
                slot.insert(DispatchRecord {
                    call_id: call_id.to_string(),
                    status: DispatchStatus::Pending,
                    attempts: 0,
                    language,
                    text: None,
                    updated_at: Utc::now(),
                });
            }
        }

        let (text, sent_language) = self.summarize(history, language).await;
        self.update(call_id, |r| {
            r.language = sent_language;
            r.text = Some(text.clone());
        });

        let mut backoff = self.config.initial_backoff;
        let mut last_error = String::from("no delivery attempted");
        for attempt in 1..=self.config.attempts.max(1) {
            self.update(call_id, |r| r.attempts = attempt);
            let result = tokio::time::timeout(
                self.config.delivery_timeout,
                self.channel.deliver(recipient, &text),
            )
            .await
            .unwrap_or_else(|_| {
                Err(Error::SummaryDeliveryFailed(format!(
                    "timed out after {}ms",
                    self.config.delivery_timeout.as_millis()
                )))
            });

            match result {
                Ok(receipt) => {
                    tracing::info!(
                        call_id,
                        channel = self.channel.channel_name(),
                        attempt,
                        "Call summary delivered"
                    );
                    metrics::counter!("agrow_summaries_total", "outcome" => "delivered").increment(1);
                    return self.finish(call_id, DispatchStatus::Delivered {
                        message_id: receipt.message_id,
                    });
                }
                Err(e) => {
                    tracing::warn!(call_id, attempt, error = %e, "Summary delivery attempt failed");
                    last_error = e.to_string();
                    if attempt < self.config.attempts {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        tracing::error!(call_id, reason = %last_error, "Giving up on call summary");
        metrics::counter!("agrow_summaries_total", "outcome" => "failed").increment(1);
        self.finish(call_id, DispatchStatus::Failed { reason: last_error })
    }

    pub fn outcome(&self, call_id: &str) -> Option<DispatchRecord> {
        self.ledger.get(call_id).map(|r| r.value().clone())
    }

    pub fn channel_name(&self) -> &str {
        self.channel.channel_name()
    }

    fn update(&self, call_id: &str, edit: impl FnOnce(&mut DispatchRecord)) {
        if let Some(mut record) = self.ledger.get_mut(call_id) {
            edit(&mut record);
            record.updated_at = Utc::now();
        }
    }

    fn finish(&self, call_id: &str, status: DispatchStatus) -> DispatchRecord {
        self.update(call_id, |r| r.status = status);
        self.outcome(call_id).unwrap_or_else(|| DispatchRecord {
            call_id: call_id.to_string(),
            status: DispatchStatus::Failed {
                reason: "ledger entry missing".to_string(),
            },
            attempts: 0,
            language: Language::English,
            text: None,
            updated_at: Utc::now(),
        })
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrow_core::{DeliveryReceipt, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyChannel {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl MessageChannel for FlakyChannel {
        async fn deliver(&self, _recipient: &str, _text: &str) -> Result<DeliveryReceipt> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                Err(Error::SummaryDeliveryFailed("503".into()))
            } else {
                Ok(DeliveryReceipt {
                    message_id: Some(format!("SM{}", n)),
                })
            }
        }

        fn channel_name(&self) -> &str {
            "flaky"
        }
    }

    struct BrokenTranslator;

    #[async_trait]
    impl Translator for BrokenTranslator {
        async fn translate_pair(&self, _t: &str, _f: Language, _to: Language) -> Result<String> {
            Err(Error::TranslationUnavailable("down".into()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn turn(q: &str, a: &str, spoken: bool) -> TurnRecord {
        TurnRecord {
            question_text: q.into(),
            answer_text: a.into(),
            question_pivot: q.into(),
            answer_pivot: a.into(),
            language: Language::English,
            timestamp: Utc::now(),
            spoken,
        }
    }

    fn fast() -> SummaryConfig {
        SummaryConfig {
            initial_backoff: Duration::from_millis(1),
            ..SummaryConfig::default()
        }
    }

    fn dispatcher(failures: u32) -> (Arc<FlakyChannel>, SummaryDispatcher) {
        let channel = Arc::new(FlakyChannel {
            failures_before_success: failures,
            calls: AtomicU32::new(0),
        });
        let d = SummaryDispatcher::new(channel.clone(), Arc::new(BrokenTranslator), fast());
        (channel, d)
    }

    #[test]
    fn test_compose_empty_history() {
        let text = SummaryDispatcher::compose(&[]);
        assert!(text.contains("No questions were answered"));
    }

    #[test]
    fn test_compose_marks_unspoken_and_truncates() {
        let long = "x".repeat(policy::SUMMARY_ITEM_CHARS + 50);
        let text = SummaryDispatcher::compose(&[
            turn("When to sow wheat?", "Sow in November.", true),
            turn(&long, "Use neem oil.", false),
        ]);
        assert!(text.contains("• Q: When to sow wheat?"));
        assert!(text.contains("Use neem oil. (could not be spoken on the call)"));
        assert!(!text.contains(&long));
        assert!(text.contains('…'));
    }

    #[tokio::test]
    async fn test_translation_failure_falls_back_to_english() {
        let (_, d) = dispatcher(0);
        let (text, lang) = d.summarize(&[turn("q", "a", true)], Language::Tamil).await;
        assert_eq!(lang, Language::English);
        assert!(text.starts_with(HEADER));
    }

    #[tokio::test]
    async fn test_retries_then_delivers() {
        let (channel, d) = dispatcher(2);
        let record = d.dispatch("CA1", "+911112345678", &[], Language::English).await;
        assert_eq!(
            record.status,
            DispatchStatus::Delivered {
                message_id: Some("SM2".into())
            }
        );
        assert_eq!(record.attempts, 3);
        assert_eq!(channel.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let (channel, d) = dispatcher(10);
        let record = d.dispatch("CA1", "+911112345678", &[], Language::English).await;
        assert!(matches!(record.status, DispatchStatus::Failed { .. }));
        assert_eq!(channel.calls.load(Ordering::SeqCst), policy::SUMMARY_DELIVERY_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_dispatch_is_idempotent() {
        let (channel, d) = dispatcher(0);
        let first = d.dispatch("CA1", "+911112345678", &[], Language::English).await;
        let second = d.dispatch("CA1", "+911112345678", &[], Language::English).await;
        assert_eq!(first, second);
        assert_eq!(channel.calls.load(Ordering::SeqCst), 1);
    }
}
