//! Chunk registry: the authoritative store of fragment state.
//!
//! Every fragment of every live session lives here, keyed by id and grouped
//! by session in sequence order. Status changes are forward-only and are
//! made exclusively by the synthesis worker.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use thiserror::Error;
use voxflow_core::{
    AudioRef, Fragment, FragmentError, FragmentId, FragmentStatus, SessionId,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The fragment was never registered or its session was purged.
    #[error("fragment {0} not found")]
    FragmentNotFound(FragmentId),

    #[error("invalid transition for fragment {id}: {from} -> {to} ({reason})")]
    InvalidTransition {
        id: FragmentId,
        from: FragmentStatus,
        to: FragmentStatus,
        reason: &'static str,
    },
}

/// Data attached to a status transition.
///
/// Ready must carry an audio ref, Error must carry an error, and
/// Processing carries nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionExtra {
    pub audio_ref: Option<AudioRef>,
    pub provider_used: Option<String>,
    pub error: Option<FragmentError>,
}

impl TransitionExtra {
    pub fn ready(audio_ref: AudioRef, provider: impl Into<String>) -> Self {
        Self {
            audio_ref: Some(audio_ref),
            provider_used: Some(provider.into()),
            error: None,
        }
    }

    pub const fn failed(error: FragmentError) -> Self {
        Self {
            audio_ref: None,
            provider_used: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Default)]
struct SessionEntry {
    next_sequence: u32,
    /// Fragment ids in sequence order.
    ids: Vec<FragmentId>,
}

#[derive(Debug, Default)]
struct RegistryState {
    fragments: HashMap<FragmentId, Fragment>,
    sessions: HashMap<SessionId, SessionEntry>,
}

/// Thread-safe fragment store.
///
/// One lock guards everything; it is only held for short synchronous
/// sections and never across an `.await`.
#[derive(Debug, Default)]
pub struct ChunkRegistry {
    state: Mutex<RegistryState>,
}

impl ChunkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new Pending fragment with the session's next sequence.
    pub fn create(&self, session_id: &SessionId, text: impl Into<String>) -> Fragment {
        let mut state = self.state();
        let entry = state.sessions.entry(session_id.clone()).or_default();
        let fragment = Fragment::pending(session_id.clone(), entry.next_sequence, text);
        entry.next_sequence += 1;
        entry.ids.push(fragment.id);
        state.fragments.insert(fragment.id, fragment.clone());
        fragment
    }

    pub fn get(&self, id: FragmentId) -> Option<Fragment> {
        self.state().fragments.get(&id).cloned()
    }

    /// Move a fragment forward and return its updated state.
    pub fn transition(
        &self,
        id: FragmentId,
        to: FragmentStatus,
        extra: TransitionExtra,
    ) -> Result<Fragment, RegistryError> {
        let mut state = self.state();
        let fragment = state
            .fragments
            .get_mut(&id)
            .ok_or(RegistryError::FragmentNotFound(id))?;

        let from = fragment.status;
        let invalid = |reason| RegistryError::InvalidTransition {
            id,
            from,
            to,
            reason,
        };

        if !from.can_transition_to(to) {
            return Err(invalid("status only moves forward"));
        }
        match to {
            FragmentStatus::Ready if extra.audio_ref.is_none() => {
                return Err(invalid("ready requires an audio ref"));
            }
            FragmentStatus::Error if extra.error.is_none() => {
                return Err(invalid("error requires an error"));
            }
            _ => {}
        }
        if to != FragmentStatus::Ready && (extra.audio_ref.is_some() || extra.provider_used.is_some())
        {
            return Err(invalid("audio ref is only set on ready"));
        }
        if to != FragmentStatus::Error && extra.error.is_some() {
            return Err(invalid("error is only set on error"));
        }

        fragment.status = to;
        fragment.audio_ref = extra.audio_ref;
        fragment.provider_used = extra.provider_used;
        fragment.error = extra.error;
        if to.is_terminal() {
            fragment.completed_at = Some(Utc::now());
        }
        Ok(fragment.clone())
    }

    /// Fragments of a session ordered by sequence.
    pub fn list_by_session(&self, session_id: &SessionId) -> Vec<Fragment> {
        let state = self.state();
        state
            .sessions
            .get(session_id)
            .map(|entry| {
                entry
                    .ids
                    .iter()
                    .filter_map(|id| state.fragments.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every fragment of a session. Returns how many were removed.
    pub fn purge_session(&self, session_id: &SessionId) -> usize {
        let mut state = self.state();
        let Some(entry) = state.sessions.remove(session_id) else {
            return 0;
        };
        for id in &entry.ids {
            state.fragments.remove(id);
        }
        entry.ids.len()
    }

    /// Fragments not yet Ready or Error, across all sessions.
    pub fn count_active(&self) -> usize {
        self.state()
            .fragments
            .values()
            .filter(|f| !f.status.is_terminal())
            .count()
    }

    /// Sessions with at least one registered fragment.
    pub fn session_count(&self) -> usize {
        self.state().sessions.len()
    }

    /// Non-terminal fragments of one session.
    pub fn pending_in_session(&self, session_id: &SessionId) -> usize {
        let state = self.state();
        state.sessions.get(session_id).map_or(0, |entry| {
            entry
                .ids
                .iter()
                .filter_map(|id| state.fragments.get(id))
                .filter(|f| !f.status.is_terminal())
                .count()
        })
    }
}
