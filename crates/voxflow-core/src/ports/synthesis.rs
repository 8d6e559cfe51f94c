//! Speech synthesis provider port.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::ErrorKind;

/// Text handed to a provider, with an optional voice hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: Option<String>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: Option<String>) -> Self {
        Self {
            text: text.into(),
            voice,
        }
    }
}

/// Encoded audio returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub data: Bytes,
    /// MIME type, e.g. `audio/wav` or `audio/mpeg`.
    pub content_type: String,
}

/// Failure of a single provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider rejected request: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::ProviderUnavailable,
            Self::Timeout(_) => ErrorKind::ProviderTimeout,
            Self::Rejected(_) => ErrorKind::ProviderRejected,
        }
    }
}

/// Failure of the whole provider chain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("all {attempts} providers failed; last error: {last}")]
    AllProvidersExhausted { attempts: usize, last: ProviderError },
}

impl SynthesisError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AllProvidersExhausted { .. } => ErrorKind::AllProvidersExhausted,
        }
    }

    /// The underlying error of the last provider tried.
    pub const fn last(&self) -> &ProviderError {
        match self {
            Self::AllProvidersExhausted { last, .. } => last,
        }
    }
}

/// A speech synthesis backend.
///
/// Implementations must be `Send + Sync`; one instance is shared by the
/// worker for the lifetime of the process.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Stable provider name, reported as `providerUsed`.
    fn name(&self) -> &str;

    /// Synthesize one fragment of text.
    async fn synthesize(&self, request: &SynthesisRequest)
    -> Result<SynthesizedAudio, ProviderError>;
}
