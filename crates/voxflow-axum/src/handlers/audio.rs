use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::HttpError;
use crate::state::AppState;

/// `GET /api/audio/{key}`
///
/// Serves stored audio. Keys are content hashes, so a hit never changes
/// and can be cached by the client.
pub async fn get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, HttpError> {
    let audio = state
        .pipeline
        .audio(&key)
        .ok_or_else(|| HttpError::NotFound(format!("audio {key} is unknown or evicted")))?;

    Ok((
        [
            (header::CONTENT_TYPE, audio.content_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        audio.data,
    )
        .into_response())
}
