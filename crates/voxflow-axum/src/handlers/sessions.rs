use axum::Json;
use axum::extract::{Path, State};
use voxflow_core::{Fragment, SessionId};

use crate::error::HttpError;
use crate::state::AppState;

/// `GET /api/sessions/{id}/fragments`
///
/// Fragments of a session that is still streaming, ordered by sequence.
pub async fn fragments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Fragment>>, HttpError> {
    Ok(Json(state.pipeline.session_fragments(&SessionId::from(id))?))
}
