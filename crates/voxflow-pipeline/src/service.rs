//! `SpeechPipeline`: the service object owning every pipeline component.
//!
//! Built once at startup and shared via `Arc`. Adapters start sessions,
//! query status and fetch audio through it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use voxflow_core::{Fragment, PipelineSettings, SessionId, SynthesisProvider};

use crate::bus::{SessionEventBus, SubscriptionId};
use crate::error::PipelineError;
use crate::orchestrator::SessionOrchestrator;
use crate::providers::{AudioStore, ProviderChain, StoredAudio};
use crate::queue::SynthesisWorker;
use crate::registry::ChunkRegistry;

/// Point-in-time view of pipeline load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    /// Fragments not yet Ready or Error.
    pub active_fragments: usize,
    pub queue_length: usize,
    pub worker_busy: bool,
    pub active_sessions: usize,
}

pub struct SpeechPipeline {
    settings: PipelineSettings,
    registry: Arc<ChunkRegistry>,
    bus: Arc<SessionEventBus>,
    chain: Arc<ProviderChain>,
    worker: Arc<SynthesisWorker>,
    active_sessions: Mutex<HashSet<SessionId>>,
}

impl SpeechPipeline {
    /// Wire registry, bus, provider chain and worker together.
    pub fn new(
        providers: Vec<Arc<dyn SynthesisProvider>>,
        settings: PipelineSettings,
    ) -> Result<Self, PipelineError> {
        settings.validate()?;

        let registry = Arc::new(ChunkRegistry::new());
        let bus = Arc::new(SessionEventBus::new());
        let store = Arc::new(AudioStore::new(settings.audio_cache_entries));
        let chain = Arc::new(ProviderChain::new(
            providers,
            settings.provider_timeout(),
            store,
        ));
        let worker = Arc::new(SynthesisWorker::new(
            Arc::clone(&registry),
            Arc::clone(&chain),
            Arc::clone(&bus),
        ));

        tracing::info!(
            target: "voxflow.pipeline",
            providers = ?chain.provider_names(),
            max_fragment_chars = settings.max_fragment_chars,
            "Speech pipeline ready"
        );

        Ok(Self {
            settings,
            registry,
            bus,
            chain,
            worker,
            active_sessions: Mutex::new(HashSet::new()),
        })
    }

    fn active(&self) -> MutexGuard<'_, HashSet<SessionId>> {
        self.active_sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub const fn registry(&self) -> &Arc<ChunkRegistry> {
        &self.registry
    }

    pub const fn bus(&self) -> &Arc<SessionEventBus> {
        &self.bus
    }

    pub const fn worker(&self) -> &Arc<SynthesisWorker> {
        &self.worker
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.chain.provider_names()
    }

    /// Reserve a session id and return its orchestrator.
    ///
    /// A fresh id is minted when none is given. An id that is still
    /// streaming is rejected.
    pub fn begin_session(
        self: &Arc<Self>,
        session_id: Option<SessionId>,
        voice: Option<String>,
    ) -> Result<SessionOrchestrator, PipelineError> {
        let session_id = session_id.unwrap_or_else(SessionId::generate);
        if !self.active().insert(session_id.clone()) {
            return Err(PipelineError::SessionAlreadyActive(session_id));
        }
        Ok(SessionOrchestrator::new(Arc::clone(self), session_id, voice))
    }

    /// Tear a session down: unsubscribe, drop queued work, purge fragments.
    pub(crate) fn end_session(&self, session_id: &SessionId, subscription: Option<SubscriptionId>) {
        if let Some(id) = subscription {
            self.bus.unsubscribe(session_id, id);
        }
        let dequeued = self.worker.purge_session(session_id);
        let purged = self.registry.purge_session(session_id);
        self.active().remove(session_id);

        tracing::debug!(
            target: "voxflow.pipeline",
            session_id = %session_id,
            dequeued,
            purged,
            "Session torn down"
        );
    }

    pub fn is_active(&self, session_id: &SessionId) -> bool {
        self.active().contains(session_id)
    }

    /// Fragments of a live session, ordered by sequence.
    pub fn session_fragments(&self, session_id: &SessionId) -> Result<Vec<Fragment>, PipelineError> {
        if !self.is_active(session_id) {
            return Err(PipelineError::SessionNotFound(session_id.clone()));
        }
        Ok(self.registry.list_by_session(session_id))
    }

    pub fn audio(&self, key: &str) -> Option<StoredAudio> {
        self.chain.store().get(key)
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            active_fragments: self.registry.count_active(),
            queue_length: self.worker.queue_len(),
            worker_busy: self.worker.is_busy(),
            active_sessions: self.active().len(),
        }
    }
}
