//! Route definitions and router construction.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use voxflow_pipeline::providers::AUDIO_ROUTE_PREFIX;

use crate::bootstrap::{AxumContext, CorsConfig};
use crate::handlers;
use crate::state::AppState;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// API routes, without state applied.
///
/// The audio route is derived from the prefix the provider chain uses when
/// it mints audio references, so the two cannot drift apart.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/chat/stream", post(handlers::chat::stream))
        .route("/api/speech/status", get(handlers::speech::status))
        .route(
            "/api/sessions/{id}/fragments",
            get(handlers::sessions::fragments),
        )
        .route(
            &format!("{AUDIO_ROUTE_PREFIX}/{{key}}"),
            get(handlers::audio::get),
        )
}

/// Create the application router.
pub fn create_router(ctx: AxumContext, cors: &CorsConfig) -> Router {
    let state: AppState = Arc::new(ctx);

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(api_routes())
        .with_state(state)
        .layer(build_cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}
