//! Fragment (chunk) domain types.
//!
//! A fragment is a contiguous span of generated text destined for
//! independent speech synthesis. Its `sequence` is assigned once at creation
//! and is the only ordering key within a session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::SessionId;

/// Unique identifier for a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(Uuid);

impl FragmentId {
    /// Mint a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FragmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Synthesis status of a fragment.
///
/// Status only ever moves forward: `Pending → Processing → (Ready | Error)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentStatus {
    /// Registered and queued, not yet picked up by the worker.
    Pending,
    /// The worker is currently synthesizing this fragment.
    Processing,
    /// Audio is available at `audio_ref`.
    Ready,
    /// Synthesis failed; see `error`.
    Error,
}

impl FragmentStatus {
    /// Whether the status is final (Ready or Error).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }

    /// Whether `next` is a legal forward transition from `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing) | (Self::Processing, Self::Ready | Self::Error)
        )
    }
}

impl fmt::Display for FragmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Classification of a per-fragment synthesis failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The provider could not be reached or is not serving.
    ProviderUnavailable,
    /// The provider did not answer within the per-call timeout.
    ProviderTimeout,
    /// The provider refused the request (bad input, auth, quota).
    ProviderRejected,
    /// Every provider in the chain failed.
    AllProvidersExhausted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ProviderTimeout => "provider_timeout",
            Self::ProviderRejected => "provider_rejected",
            Self::AllProvidersExhausted => "all_providers_exhausted",
        };
        f.write_str(s)
    }
}

/// Error recorded on a fragment that ended in [`FragmentStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentError {
    /// Stable classification for clients.
    pub kind: ErrorKind,
    /// Human-readable detail (last underlying provider error).
    pub detail: String,
}

/// Reference to synthesized audio, usually a server-relative URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(String);

impl AudioRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered fragment and its synthesis state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub id: FragmentId,
    pub session_id: SessionId,
    /// Per-session ordering key, contiguous from 0.
    pub sequence: u32,
    /// Text handed to the provider chain.
    pub text: String,
    pub status: FragmentStatus,
    /// Set if and only if `status == Ready`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<AudioRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FragmentError>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Fragment {
    /// Create a new pending fragment.
    pub fn pending(session_id: SessionId, sequence: u32, text: impl Into<String>) -> Self {
        Self {
            id: FragmentId::new(),
            session_id,
            sequence,
            text: text.into(),
            status: FragmentStatus::Pending,
            audio_ref: None,
            provider_used: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}
