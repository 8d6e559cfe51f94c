//! The single synthesis worker.
//!
//! Pops fragments off the [`SynthesisQueue`] one at a time, runs them
//! through the provider chain and records the outcome in the registry
//! before publishing a lifecycle event. Being the only consumer gives
//! in-order completion within a session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use voxflow_core::{ChunkEvent, Fragment, FragmentError, FragmentStatus, SessionId};

use super::{QueuedFragment, SynthesisQueue};
use crate::bus::SessionEventBus;
use crate::providers::ProviderChain;
use crate::registry::{ChunkRegistry, RegistryError, TransitionExtra};

pub struct SynthesisWorker {
    queue: Mutex<SynthesisQueue>,
    /// Wakes the runner when work is enqueued.
    queue_notify: Notify,
    /// Whether the runner has been started (never reset).
    runner_started: AtomicBool,
    /// Set while a fragment is being synthesized.
    busy: AtomicBool,
    registry: Arc<ChunkRegistry>,
    chain: Arc<ProviderChain>,
    bus: Arc<SessionEventBus>,
}

impl SynthesisWorker {
    pub fn new(
        registry: Arc<ChunkRegistry>,
        chain: Arc<ProviderChain>,
        bus: Arc<SessionEventBus>,
    ) -> Self {
        Self {
            queue: Mutex::new(SynthesisQueue::new()),
            queue_notify: Notify::new(),
            runner_started: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            registry,
            chain,
            bus,
        }
    }

    fn queue(&self) -> MutexGuard<'_, SynthesisQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a registered fragment for synthesis. Returns its queue position.
    pub fn enqueue(self: &Arc<Self>, fragment: &Fragment, voice: Option<String>) -> usize {
        let position = self
            .queue()
            .enqueue(QueuedFragment::from_fragment(fragment, voice));

        tracing::debug!(
            target: "voxflow.worker",
            session_id = %fragment.session_id,
            fragment_id = %fragment.id,
            sequence = fragment.sequence,
            position,
            "Fragment queued"
        );

        self.queue_notify.notify_one();
        self.ensure_runner();
        position
    }

    /// Drop every queued (not yet started) fragment of a session.
    pub fn purge_session(&self, session_id: &SessionId) -> usize {
        self.queue().purge_session(session_id)
    }

    pub fn queue_len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Ensure the runner is started.
    ///
    /// Idempotent: only the first call spawns. The runner lives as long as
    /// the worker.
    pub fn ensure_runner(self: &Arc<Self>) {
        if self
            .runner_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let worker = Arc::clone(self);
            tokio::spawn(async move {
                worker.run_loop().await;
            });
        }
    }

    async fn run_loop(&self) {
        loop {
            let next = self.queue().dequeue();
            if let Some(item) = next {
                self.busy.store(true, Ordering::SeqCst);
                self.process(item).await;
                self.busy.store(false, Ordering::SeqCst);
            } else {
                self.queue_notify.notified().await;
            }
        }
    }

    async fn process(&self, item: QueuedFragment) {
        let started = self.registry.transition(
            item.fragment_id,
            FragmentStatus::Processing,
            TransitionExtra::default(),
        );
        if Self::accept(&item, started).is_none() {
            return;
        }

        let (status, extra) = match self
            .chain
            .synthesize(&item.text, item.voice.as_deref())
            .await
        {
            Ok(synthesis) => (
                FragmentStatus::Ready,
                TransitionExtra::ready(synthesis.audio_ref, synthesis.provider),
            ),
            Err(err) => {
                tracing::warn!(
                    target: "voxflow.worker",
                    session_id = %item.session_id,
                    sequence = item.sequence,
                    error = %err,
                    "Fragment synthesis failed"
                );
                (
                    FragmentStatus::Error,
                    TransitionExtra::failed(FragmentError {
                        kind: err.kind(),
                        detail: err.last().to_string(),
                    }),
                )
            }
        };

        let finished = self.registry.transition(item.fragment_id, status, extra);
        let Some(fragment) = Self::accept(&item, finished) else {
            return;
        };

        tracing::debug!(
            target: "voxflow.worker",
            session_id = %item.session_id,
            sequence = item.sequence,
            status = %fragment.status,
            wait_ms = u64::try_from(item.queued_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Fragment finished"
        );

        if let Some(event) = ChunkEvent::from_fragment(&fragment) {
            self.bus.publish(event);
        }
    }

    /// Unwrap a registry result, treating a vanished fragment as a purged
    /// session.
    fn accept(item: &QueuedFragment, result: Result<Fragment, RegistryError>) -> Option<Fragment> {
        match result {
            Ok(fragment) => Some(fragment),
            Err(RegistryError::FragmentNotFound(_)) => {
                tracing::debug!(
                    target: "voxflow.worker",
                    session_id = %item.session_id,
                    sequence = item.sequence,
                    "Session purged, discarding fragment"
                );
                None
            }
            Err(err) => {
                tracing::error!(target: "voxflow.worker", error = %err, "Invalid fragment transition");
                debug_assert!(false, "invalid fragment transition: {err}");
                None
            }
        }
    }
}
