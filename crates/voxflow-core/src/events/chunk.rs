use serde::{Deserialize, Serialize};

use crate::domain::{AudioRef, ErrorKind, Fragment, FragmentId, FragmentStatus, SessionId};

/// Fragment lifecycle event published by the synthesis worker.
///
/// Every variant carries the owning session so the event bus can route it
/// without consulting the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChunkEvent {
    /// A fragment finished synthesis successfully.
    Ready {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        #[serde(rename = "fragmentId")]
        fragment_id: FragmentId,
        sequence: u32,
        #[serde(rename = "audioRef")]
        audio_ref: AudioRef,
        #[serde(rename = "providerUsed")]
        provider_used: String,
    },

    /// A fragment failed synthesis on every provider.
    Error {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        #[serde(rename = "fragmentId")]
        fragment_id: FragmentId,
        sequence: u32,
        #[serde(rename = "errorKind")]
        error_kind: ErrorKind,
        detail: String,
    },
}

impl ChunkEvent {
    /// Build the lifecycle event for a fragment that reached a terminal status.
    ///
    /// Returns `None` for non-terminal fragments or a Ready fragment missing
    /// its audio reference.
    pub fn from_fragment(fragment: &Fragment) -> Option<Self> {
        match fragment.status {
            FragmentStatus::Ready => Some(Self::Ready {
                session_id: fragment.session_id.clone(),
                fragment_id: fragment.id,
                sequence: fragment.sequence,
                audio_ref: fragment.audio_ref.clone()?,
                provider_used: fragment.provider_used.clone().unwrap_or_default(),
            }),
            FragmentStatus::Error => {
                let error = fragment.error.as_ref()?;
                Some(Self::Error {
                    session_id: fragment.session_id.clone(),
                    fragment_id: fragment.id,
                    sequence: fragment.sequence,
                    error_kind: error.kind,
                    detail: error.detail.clone(),
                })
            }
            FragmentStatus::Pending | FragmentStatus::Processing => None,
        }
    }

    pub const fn session_id(&self) -> &SessionId {
        match self {
            Self::Ready { session_id, .. } | Self::Error { session_id, .. } => session_id,
        }
    }

    pub const fn sequence(&self) -> u32 {
        match self {
            Self::Ready { sequence, .. } | Self::Error { sequence, .. } => *sequence,
        }
    }

    /// Get the event name for wire protocols.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "chunk:ready",
            Self::Error { .. } => "chunk:error",
        }
    }
}
