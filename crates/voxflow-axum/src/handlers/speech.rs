use axum::Json;
use axum::extract::State;
use voxflow_pipeline::PipelineStatus;

use crate::state::AppState;

/// `GET /api/speech/status`
pub async fn status(State(state): State<AppState>) -> Json<PipelineStatus> {
    Json(state.pipeline.status())
}
