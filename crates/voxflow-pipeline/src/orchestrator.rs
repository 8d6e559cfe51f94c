//! Session orchestrator.
//!
//! Drives one streaming session through `Streaming → Draining → Closed`:
//! forwards generator tokens to the client, cuts complete sentences into
//! fragments for the worker, relays fragment lifecycle events from the bus
//! and always finishes with `stream-end` unless the client went away.
//!
//! Teardown (unsubscribe, queue purge, registry purge) happens when the
//! orchestrator is dropped, so an aborted task cleans up as well.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use voxflow_core::text::{DetectorConfig, detect_with, is_speakable, speech_text, split_complete};
use voxflow_core::{
    ChunkEvent, GenerationRequest, GeneratorError, Session, SessionId, SessionState, StreamEvent,
    StreamSummary, TextGenerator, TokenStream,
};

use crate::bus::SubscriptionId;
use crate::service::SpeechPipeline;

/// The client transport is gone.
struct Disconnected;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session_id: SessionId,
    pub state: SessionState,
    pub summary: StreamSummary,
    pub client_disconnected: bool,
    pub generator_error: Option<GeneratorError>,
    /// Characters of generated text received.
    pub accumulated_chars: usize,
}

pub struct SessionOrchestrator {
    pipeline: Arc<SpeechPipeline>,
    session: Session,
    voice: Option<String>,
    detector: DetectorConfig,
    min_chars: usize,
    /// Text not yet closed by a sentence terminator.
    buffer: String,
    /// Complete fragments too short to send on their own.
    held: String,
    summary: StreamSummary,
    subscription: Option<SubscriptionId>,
}

impl SessionOrchestrator {
    pub(crate) fn new(
        pipeline: Arc<SpeechPipeline>,
        session_id: SessionId,
        voice: Option<String>,
    ) -> Self {
        let settings = pipeline.settings();
        let detector = settings.detector();
        let min_chars = settings.min_fragment_chars;
        let voice = voice.or_else(|| settings.default_voice.clone());

        Self {
            pipeline,
            session: Session::new(session_id),
            voice,
            detector,
            min_chars,
            buffer: String::new(),
            held: String::new(),
            summary: StreamSummary::default(),
            subscription: None,
        }
    }

    pub const fn session_id(&self) -> &SessionId {
        &self.session.id
    }

    /// Run the session to completion, pushing events into `tx`.
    ///
    /// Returns once `stream-end` has been sent or the client disconnected.
    pub async fn run(
        mut self,
        generator: Arc<dyn TextGenerator>,
        request: GenerationRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> SessionOutcome {
        let mut subscription = self.pipeline.bus().subscribe(&self.session.id);
        self.subscription = Some(subscription.id);

        tracing::info!(
            target: "voxflow.session",
            session_id = %self.session.id,
            model = generator.model(),
            "Session started"
        );

        let result = self
            .lifecycle(generator.as_ref(), request, &tx, &mut subscription.receiver)
            .await;
        let (client_disconnected, generator_error) = match result {
            Ok(failure) => (false, failure),
            Err(Disconnected) => (true, None),
        };
        self.session.state = SessionState::Closed;

        let outcome = SessionOutcome {
            session_id: self.session.id.clone(),
            state: self.session.state,
            summary: self.summary,
            client_disconnected,
            generator_error,
            accumulated_chars: self.session.accumulated_text.chars().count(),
        };

        tracing::info!(
            target: "voxflow.session",
            session_id = %outcome.session_id,
            fragments = outcome.summary.fragments,
            ready = outcome.summary.ready,
            failed = outcome.summary.failed,
            timed_out = outcome.summary.timed_out,
            disconnected = outcome.client_disconnected,
            "Session closed"
        );
        outcome
    }

    async fn lifecycle(
        &mut self,
        generator: &dyn TextGenerator,
        request: GenerationRequest,
        tx: &mpsc::Sender<StreamEvent>,
        events: &mut mpsc::UnboundedReceiver<ChunkEvent>,
    ) -> Result<Option<GeneratorError>, Disconnected> {
        let failure = self.stream(generator, request, tx, events).await?;
        self.drain(tx, events).await?;
        Self::send(
            tx,
            StreamEvent::StreamEnd {
                summary: self.summary,
            },
        )
        .await?;
        Ok(failure)
    }

    /// Streaming state. Returns the generator failure, if any.
    async fn stream(
        &mut self,
        generator: &dyn TextGenerator,
        request: GenerationRequest,
        tx: &mpsc::Sender<StreamEvent>,
        events: &mut mpsc::UnboundedReceiver<ChunkEvent>,
    ) -> Result<Option<GeneratorError>, Disconnected> {
        Self::send(
            tx,
            StreamEvent::Meta {
                session_id: self.session.id.clone(),
                model: generator.model().to_string(),
                providers: self.pipeline.provider_names(),
            },
        )
        .await?;

        let idle_timeout = self.pipeline.settings().session_idle_timeout();
        let opened = tokio::select! {
            biased;
            () = tx.closed() => return Err(Disconnected),
            opened = generator.stream(request) => opened,
            () = tokio::time::sleep(idle_timeout) => Err(GeneratorError::IdleTimeout(idle_timeout)),
        };

        let failure = match opened {
            Ok(tokens) => self.consume(tokens, tx, events).await?,
            Err(err) => Some(err),
        };

        if let Some(err) = &failure {
            tracing::warn!(
                target: "voxflow.session",
                session_id = %self.session.id,
                error = %err,
                "Text generator failed, draining"
            );
            Self::send(tx, StreamEvent::error(err.to_string())).await?;
        }

        self.flush();
        Ok(failure)
    }

    async fn consume(
        &mut self,
        mut tokens: TokenStream,
        tx: &mpsc::Sender<StreamEvent>,
        events: &mut mpsc::UnboundedReceiver<ChunkEvent>,
    ) -> Result<Option<GeneratorError>, Disconnected> {
        let idle_timeout = self.pipeline.settings().session_idle_timeout();
        let idle = tokio::time::sleep(idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;
                () = tx.closed() => return Err(Disconnected),
                Some(event) = events.recv() => self.relay(tx, event).await?,
                next = tokens.next() => match next {
                    Some(Ok(token)) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                        self.on_token(tx, token).await?;
                    }
                    Some(Err(err)) => return Ok(Some(err)),
                    None => return Ok(None),
                },
                () = &mut idle => return Ok(Some(GeneratorError::IdleTimeout(idle_timeout))),
            }
        }
    }

    /// Draining state: wait for outstanding fragments or the drain timeout.
    async fn drain(
        &mut self,
        tx: &mpsc::Sender<StreamEvent>,
        events: &mut mpsc::UnboundedReceiver<ChunkEvent>,
    ) -> Result<(), Disconnected> {
        self.session.state = SessionState::Draining;
        let deadline = Instant::now() + self.pipeline.settings().drain_timeout();

        while self.summary.outstanding() > 0 {
            tokio::select! {
                biased;
                () = tx.closed() => return Err(Disconnected),
                event = events.recv() => match event {
                    Some(event) => self.relay(tx, event).await?,
                    None => break,
                },
                () = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(
                        target: "voxflow.session",
                        session_id = %self.session.id,
                        outstanding = self.summary.outstanding(),
                        "Drain timeout elapsed"
                    );
                    self.summary.timed_out = true;
                    break;
                }
            }
        }
        Ok(())
    }

    async fn on_token(
        &mut self,
        tx: &mpsc::Sender<StreamEvent>,
        token: String,
    ) -> Result<(), Disconnected> {
        self.session.accumulated_text.push_str(&token);
        self.buffer.push_str(&token);
        Self::send(tx, StreamEvent::text_delta(token)).await?;

        let (complete, rest) = split_complete(&self.buffer, &self.detector);
        self.buffer = rest;
        for fragment in complete {
            self.offer(&fragment);
        }
        Ok(())
    }

    async fn relay(
        &mut self,
        tx: &mpsc::Sender<StreamEvent>,
        event: ChunkEvent,
    ) -> Result<(), Disconnected> {
        match event {
            ChunkEvent::Ready { .. } => self.summary.ready += 1,
            ChunkEvent::Error { .. } => self.summary.failed += 1,
        }
        Self::send(tx, event.into()).await
    }

    async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<(), Disconnected> {
        tx.send(event).await.map_err(|_| Disconnected)
    }

    /// Apply the minimum-length policy to a complete fragment.
    ///
    /// Held text is only merged while the result stays within the detector's
    /// maximum; otherwise it is registered on its own first.
    fn offer(&mut self, text: &str) {
        if !self.held.is_empty() {
            let merged = self.held.chars().count() + 1 + text.chars().count();
            if merged > self.detector.max_chars {
                let held = std::mem::take(&mut self.held);
                self.register(&held);
            } else {
                self.held.push(' ');
            }
        }
        self.held.push_str(text);

        if speech_text(&self.held).chars().count() >= self.min_chars {
            let text = std::mem::take(&mut self.held);
            self.register(&text);
        }
    }

    /// Register everything still buffered or held, regardless of length.
    fn flush(&mut self) {
        let rest = std::mem::take(&mut self.buffer);
        for fragment in detect_with(&rest, &self.detector) {
            self.offer(&fragment);
        }
        if !self.held.is_empty() {
            let text = std::mem::take(&mut self.held);
            self.register(&text);
        }
    }

    fn register(&mut self, text: &str) {
        let speech = speech_text(text);
        if !is_speakable(&speech) {
            tracing::debug!(
                target: "voxflow.session",
                session_id = %self.session.id,
                "Skipping fragment with nothing to speak"
            );
            return;
        }

        let fragment = self.pipeline.registry().create(&self.session.id, speech);
        self.session.next_sequence = fragment.sequence + 1;
        self.summary.fragments += 1;
        self.pipeline.worker().enqueue(&fragment, self.voice.clone());
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.pipeline
            .end_session(&self.session.id, self.subscription.take());
    }
}
