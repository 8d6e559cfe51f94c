use serde::{Deserialize, Serialize};

use crate::domain::{AudioRef, ErrorKind, FragmentId, SessionId};

use super::ChunkEvent;

/// Counts reported with the terminal `stream-end` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    /// Fragments registered for synthesis.
    pub fragments: u32,
    /// Fragments that reached Ready before the stream ended.
    pub ready: u32,
    /// Fragments that reached Error before the stream ended.
    pub failed: u32,
    /// Whether draining stopped because the drain timeout elapsed.
    pub timed_out: bool,
}

impl StreamSummary {
    /// Fragments still outstanding (neither Ready nor Error).
    pub const fn outstanding(&self) -> u32 {
        self.fragments.saturating_sub(self.ready + self.failed)
    }
}

/// Event pushed to a client over its streaming transport.
///
/// Order over a session's lifetime: `Meta`, then interleaved `TextDelta`
/// and `AudioChunk`/`AudioError`, optionally `Error`, and always a final
/// `StreamEnd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    /// Session and model information, sent first.
    Meta {
        session_id: SessionId,
        model: String,
        providers: Vec<String>,
    },

    /// Raw text token from the generator.
    TextDelta { content: String },

    /// Audio for a fragment is ready.
    AudioChunk {
        fragment_id: FragmentId,
        sequence: u32,
        audio_ref: AudioRef,
        provider_used: String,
    },

    /// Audio for a fragment could not be produced.
    AudioError {
        fragment_id: FragmentId,
        sequence: u32,
        error_kind: ErrorKind,
    },

    /// The text generator failed; the session drains what it has.
    Error { message: String },

    /// Terminal event. The channel closes after this.
    StreamEnd {
        #[serde(flatten)]
        summary: StreamSummary,
    },
}

impl StreamEvent {
    /// Get the event name for wire protocols (SSE `event:` field).
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Meta { .. } => "meta",
            Self::TextDelta { .. } => "text-delta",
            Self::AudioChunk { .. } => "audio-chunk",
            Self::AudioError { .. } => "audio-error",
            Self::Error { .. } => "error",
            Self::StreamEnd { .. } => "stream-end",
        }
    }

    pub fn text_delta(content: impl Into<String>) -> Self {
        Self::TextDelta {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::StreamEnd { .. })
    }
}

impl From<ChunkEvent> for StreamEvent {
    fn from(event: ChunkEvent) -> Self {
        match event {
            ChunkEvent::Ready {
                fragment_id,
                sequence,
                audio_ref,
                provider_used,
                ..
            } => Self::AudioChunk {
                fragment_id,
                sequence,
                audio_ref,
                provider_used,
            },
            ChunkEvent::Error {
                fragment_id,
                sequence,
                error_kind,
                ..
            } => Self::AudioError {
                fragment_id,
                sequence,
                error_kind,
            },
        }
    }
}
