//! Shared fixtures for pipeline integration tests.
//!
//! Scripted text generators and canned speech providers. Nothing here
//! touches the network.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use voxflow_core::{
    GenerationRequest, GeneratorError, PipelineSettings, ProviderError, StreamEvent,
    SynthesisProvider, SynthesisRequest, SynthesizedAudio, TextGenerator, TokenStream,
};
use voxflow_pipeline::{SessionOutcome, SilenceProvider, SpeechPipeline};

// ── Generators ─────────────────────────────────────────────────────

/// Yields a fixed script of tokens (and optional failure), then finishes
/// or hangs.
pub struct ScriptedGenerator {
    items: Vec<Result<String, GeneratorError>>,
    hang_after: bool,
    stall_open: bool,
    fail_to_open: Option<GeneratorError>,
}

impl ScriptedGenerator {
    pub fn tokens(tokens: &[&str]) -> Self {
        Self {
            items: tokens.iter().map(|t| Ok((*t).to_string())).collect(),
            hang_after: false,
            stall_open: false,
            fail_to_open: None,
        }
    }

    /// Tokens followed by a mid-stream error.
    pub fn failing_after(tokens: &[&str], error: GeneratorError) -> Self {
        let mut generator = Self::tokens(tokens);
        generator.items.push(Err(error));
        generator
    }

    /// Tokens followed by silence that never ends.
    pub fn hanging_after(tokens: &[&str]) -> Self {
        let mut generator = Self::tokens(tokens);
        generator.hang_after = true;
        generator
    }

    /// Never returns from `stream`, like an upstream that accepts the
    /// connection but sends no headers.
    pub fn stalled() -> Self {
        let mut generator = Self::tokens(&[]);
        generator.stall_open = true;
        generator
    }

    pub fn unreachable(error: GeneratorError) -> Self {
        let mut generator = Self::tokens(&[]);
        generator.fail_to_open = Some(error);
        generator
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, _request: GenerationRequest) -> Result<TokenStream, GeneratorError> {
        if self.stall_open {
            std::future::pending::<()>().await;
        }
        if let Some(err) = &self.fail_to_open {
            return Err(err.clone());
        }
        let script = stream::iter(self.items.clone());
        if self.hang_after {
            Ok(Box::pin(script.chain(stream::pending())))
        } else {
            Ok(Box::pin(script))
        }
    }
}

// ── Providers ──────────────────────────────────────────────────────

/// Always fails with the configured error.
pub struct FailingProvider {
    name: String,
    error: ProviderError,
}

impl FailingProvider {
    pub fn new(name: &str, error: ProviderError) -> Self {
        Self {
            name: name.to_string(),
            error,
        }
    }
}

#[async_trait]
impl SynthesisProvider for FailingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize(&self, _request: &SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        Err(self.error.clone())
    }
}

/// Silence after a fixed delay.
pub struct SlowProvider {
    delay: Duration,
    inner: SilenceProvider,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: SilenceProvider::new("slow"),
        }
    }
}

#[async_trait]
impl SynthesisProvider for SlowProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.synthesize(request).await
    }
}

/// Silence, counting every call.
#[derive(Default)]
pub struct CountingProvider {
    calls: AtomicUsize,
    inner: SilenceProvider,
}

impl CountingProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.synthesize(request).await
    }
}

/// Silence, remembering the text of every request in call order.
#[derive(Default)]
pub struct RecordingProvider {
    texts: Mutex<Vec<String>>,
    inner: SilenceProvider,
}

impl RecordingProvider {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SynthesisProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        self.texts.lock().unwrap().push(request.text.clone());
        self.inner.synthesize(request).await
    }
}

// ── Harness ────────────────────────────────────────────────────────

pub fn pipeline(providers: Vec<Arc<dyn SynthesisProvider>>) -> Arc<SpeechPipeline> {
    pipeline_with(providers, PipelineSettings::default())
}

pub fn pipeline_with(
    providers: Vec<Arc<dyn SynthesisProvider>>,
    settings: PipelineSettings,
) -> Arc<SpeechPipeline> {
    Arc::new(SpeechPipeline::new(providers, settings).expect("valid settings"))
}

/// Run one session to completion, collecting every event the client sees.
pub async fn run_session(
    pipeline: &Arc<SpeechPipeline>,
    generator: ScriptedGenerator,
) -> (SessionOutcome, Vec<StreamEvent>) {
    let orchestrator = pipeline.begin_session(None, None).expect("fresh session");
    let (tx, mut rx) = mpsc::channel(64);
    let handle = tokio::spawn(orchestrator.run(
        Arc::new(generator),
        GenerationRequest::new("How are you?"),
        tx,
    ));

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (handle.await.expect("session task"), events)
}

pub fn audio_events(events: &[StreamEvent]) -> Vec<&StreamEvent> {
    events
        .iter()
        .filter(|e| matches!(e, StreamEvent::AudioChunk { .. } | StreamEvent::AudioError { .. }))
        .collect()
}

pub fn audio_sequences(events: &[StreamEvent]) -> Vec<u32> {
    audio_events(events)
        .into_iter()
        .map(|e| match e {
            StreamEvent::AudioChunk { sequence, .. } | StreamEvent::AudioError { sequence, .. } => *sequence,
            _ => unreachable!(),
        })
        .collect()
}

pub fn event_names(events: &[StreamEvent]) -> Vec<&'static str> {
    events.iter().map(StreamEvent::event_name).collect()
}
