//! Scriptable in-memory adapters

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agrow_agent::{
    Adapters, OrchestratorConfig, SummaryConfig, SummaryDispatcher, TurnOrchestrator,
};
use agrow_core::{
    AnswerGenerator, AudioClip, AudioFormat, DeliveryReceipt, Error, HistoryTurn, Language,
    MessageChannel, Result, Retriever, Snippet, SpeechSynthesizer, Transcriber, Transcription,
    Translator,
};
use async_trait::async_trait;

pub const HINDI_CALLER: &str = "+911112345678";
pub const TAMIL_CALLER: &str = "+914412345678";
pub const US_CALLER: &str = "+14155550100";

pub fn clip() -> AudioClip {
    AudioClip::new(vec![0x52, 0x49, 0x46, 0x46, 1, 2, 3, 4], AudioFormat::Wav)
}

pub fn heard(text: &str, tag: Option<&str>, confidence: f32) -> Result<Transcription> {
    Ok(Transcription::new(text, tag.map(str::to_string), confidence))
}

#[derive(Default)]
pub struct ScriptedTranscriber {
    queue: Mutex<VecDeque<Result<Transcription>>>,
    pub calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn push(&self, result: Result<Transcription>) {
        self.queue.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _audio: &AudioClip) -> Result<Transcription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| heard("How do I control aphids on mustard?", None, 0.9))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Tags text with the target language; can be switched off
#[derive(Default)]
pub struct TaggingTranslator {
    pub failing: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Translator for TaggingTranslator {
    async fn translate_pair(&self, text: &str, _from: Language, to: Language) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::TranslationUnavailable("503".into()));
        }
        Ok(format!("[{}] {}", to.code(), text))
    }

    fn name(&self) -> &str {
        "tagging"
    }
}

#[derive(Default)]
pub struct FixedRetriever {
    pub snippets: Mutex<Vec<Snippet>>,
    pub failing: AtomicBool,
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<Snippet>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::RetrievalUnavailable("qdrant down".into()));
        }
        let mut found = self.snippets.lock().unwrap().clone();
        found.truncate(k);
        Ok(found)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum GeneratorMode {
    Answer,
    /// Never returns
    Hang,
    /// Sleeps well past any test timeout
    Slow,
    /// Waits for [`MockGenerator::release`], then answers
    Held,
}

pub struct MockGenerator {
    pub mode: Mutex<GeneratorMode>,
    pub capabilities: Vec<Language>,
    pub calls: AtomicUsize,
    /// (question, language, snippet count, history length) per call
    pub seen: Mutex<Vec<(String, Language, usize, usize)>>,
    gate: tokio::sync::Semaphore,
}

impl MockGenerator {
    pub fn new(capabilities: Vec<Language>) -> Self {
        Self {
            mode: Mutex::new(GeneratorMode::Answer),
            capabilities,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            gate: tokio::sync::Semaphore::new(0),
        }
    }

    /// Let one held generation through
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn set_mode(&self, mode: GeneratorMode) {
        *self.mode.lock().unwrap() = mode;
    }
}

#[async_trait]
impl AnswerGenerator for MockGenerator {
    async fn generate(
        &self,
        question: &str,
        language: Language,
        context: &[Snippet],
        history: &[HistoryTurn],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            question.to_string(),
            language,
            context.len(),
            history.len(),
        ));
        let mode = *self.mode.lock().unwrap();
        match mode {
            GeneratorMode::Answer => Ok(format!("Spray neem oil. ({} sources)", context.len())),
            GeneratorMode::Hang => std::future::pending().await,
            GeneratorMode::Slow => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
            GeneratorMode::Held => {
                let _permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|e| Error::GenerationUnavailable(e.to_string()))?;
                Ok(format!("Spray neem oil. ({} sources)", context.len()))
            }
        }
    }

    fn capabilities(&self) -> &[Language] {
        &self.capabilities
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

#[derive(Default)]
pub struct MockSynthesizer {
    pub failing: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _language: Language) -> Result<AudioClip> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::SynthesisUnavailable("500".into()));
        }
        Ok(AudioClip::new(text.as_bytes().to_vec(), AudioFormat::Mp3))
    }

    fn model_name(&self) -> &str {
        "mock-tts"
    }
}

#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn deliver(&self, recipient: &str, text: &str) -> Result<DeliveryReceipt> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((recipient.to_string(), text.to_string()));
        Ok(DeliveryReceipt {
            message_id: Some(format!("SM{}", sent.len())),
        })
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}

pub struct Harness {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub translator: Arc<TaggingTranslator>,
    pub retriever: Arc<FixedRetriever>,
    pub generator: Arc<MockGenerator>,
    pub synthesizer: Arc<MockSynthesizer>,
    pub channel: Arc<RecordingChannel>,
}

pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        retry_backoff: Duration::from_millis(1),
        ..OrchestratorConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with(fast_config(), vec![Language::English, Language::Hindi])
}

pub fn harness_with(config: OrchestratorConfig, capabilities: Vec<Language>) -> Harness {
    let transcriber = Arc::new(ScriptedTranscriber::default());
    let translator = Arc::new(TaggingTranslator::default());
    let retriever = Arc::new(FixedRetriever::default());
    retriever.snippets.lock().unwrap().push(Snippet::new(
        "aphids-mustard",
        "Spray neem oil 5 ml per litre when aphids appear on mustard.",
        0.8,
    ));
    let generator = Arc::new(MockGenerator::new(capabilities));
    let synthesizer = Arc::new(MockSynthesizer::default());
    let channel = Arc::new(RecordingChannel::default());

    let summaries = Arc::new(SummaryDispatcher::new(
        channel.clone(),
        translator.clone(),
        SummaryConfig {
            initial_backoff: Duration::from_millis(1),
            ..SummaryConfig::default()
        },
    ));
    let adapters = Adapters {
        transcriber: transcriber.clone(),
        translator: translator.clone(),
        retriever: retriever.clone(),
        generator: generator.clone(),
        synthesizer: synthesizer.clone(),
    };
    Harness {
        orchestrator: Arc::new(TurnOrchestrator::new(adapters, summaries, config)),
        transcriber,
        translator,
        retriever,
        generator,
        synthesizer,
        channel,
    }
}
