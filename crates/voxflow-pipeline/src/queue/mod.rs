//! Synthesis queue management.
//!
//! This module provides a pure FIFO of fragments awaiting synthesis.
//! No I/O is performed here; the [`SynthesisWorker`] owns the queue behind
//! a lock and drives it.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO, no tracing)
//! - Session purges filter the queue in place; other sessions keep their
//!   relative order

mod worker;

use std::collections::VecDeque;
use std::time::Instant;

use voxflow_core::{Fragment, FragmentId, SessionId};

pub use worker::SynthesisWorker;

/// A fragment waiting for the worker.
#[derive(Debug, Clone)]
pub struct QueuedFragment {
    pub fragment_id: FragmentId,
    pub session_id: SessionId,
    pub sequence: u32,
    pub text: String,
    pub voice: Option<String>,
    pub queued_at: Instant,
}

impl QueuedFragment {
    pub fn from_fragment(fragment: &Fragment, voice: Option<String>) -> Self {
        Self {
            fragment_id: fragment.id,
            session_id: fragment.session_id.clone(),
            sequence: fragment.sequence,
            text: fragment.text.clone(),
            voice,
            queued_at: Instant::now(),
        }
    }
}

/// Unbounded FIFO of pending synthesis work.
///
/// This is a sync type with no internal locking; the caller
/// ([`SynthesisWorker`]) is responsible for synchronization.
#[derive(Debug, Default)]
pub struct SynthesisQueue {
    pending: VecDeque<QueuedFragment>,
}

impl SynthesisQueue {
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Append to the tail. Returns the 1-based queue position.
    pub fn enqueue(&mut self, item: QueuedFragment) -> usize {
        self.pending.push_back(item);
        self.pending.len()
    }

    /// Pop the head of the queue.
    pub fn dequeue(&mut self) -> Option<QueuedFragment> {
        self.pending.pop_front()
    }

    /// Remove every queued item of a session. Returns how many were removed.
    pub fn purge_session(&mut self, session_id: &SessionId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|item| &item.session_id != session_id);
        before - self.pending.len()
    }

    pub fn is_queued(&self, id: FragmentId) -> bool {
        self.pending.iter().any(|item| item.fragment_id == id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
