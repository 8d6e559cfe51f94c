//! Streaming chat endpoint.
//!
//! `POST /api/chat/stream` reserves a session, spawns its orchestrator and
//! answers with an SSE stream fed by the orchestrator's event channel.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures_util::stream::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use voxflow_core::{GenerationRequest, SessionId};

use crate::error::HttpError;
use crate::sse::session_stream;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub voice_hint: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// `POST /api/chat/stream`
pub async fn stream(
    State(state): State<AppState>,
    Json(body): Json<ChatStreamRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static>, HttpError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(HttpError::BadRequest("message must not be empty".to_string()));
    }

    let session_id = body
        .session_id
        .filter(|id| !id.trim().is_empty())
        .map(SessionId::from);
    let orchestrator = state.pipeline.begin_session(session_id, body.voice_hint)?;

    let mut request = GenerationRequest::new(message);
    if let Some(prompt) = body.system_prompt.or_else(|| state.system_prompt.clone()) {
        request = request.with_system_prompt(prompt);
    }

    let (tx, rx) = mpsc::channel(state.pipeline.settings().transport_buffer);
    let generator = Arc::clone(&state.generator);
    tokio::spawn(async move {
        let outcome = orchestrator.run(generator, request, tx).await;
        if let Some(err) = outcome.generator_error {
            tracing::debug!(
                target: "voxflow.http",
                session_id = %outcome.session_id,
                error = %err,
                "Chat stream ended after generator failure"
            );
        }
    });

    Ok(session_stream(rx))
}
