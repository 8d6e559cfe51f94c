//! Text generator port: an incremental token stream from a language model.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use thiserror::Error;

/// Tokens as they arrive. The stream ends on finish; an `Err` item is a
/// mid-stream failure and no further items follow it.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, GeneratorError>> + Send>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub message: String,
    pub system_prompt: Option<String>,
}

impl GenerationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            system_prompt: None,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("malformed stream: {0}")]
    Protocol(String),

    #[error("no token received for {0:?}")]
    IdleTimeout(Duration),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model name reported in the `meta` event.
    fn model(&self) -> &str;

    /// Start generating. Errors returned here happen before the first token.
    async fn stream(&self, request: GenerationRequest) -> Result<TokenStream, GeneratorError>;
}
