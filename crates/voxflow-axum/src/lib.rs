//! Axum HTTP/SSE adapter for voxflow.
//!
//! [`bootstrap`] is the composition root: it builds the shared
//! [`SpeechPipeline`](voxflow_pipeline::SpeechPipeline), the upstream text
//! generator and the synthesis providers from a [`ServerConfig`]. The
//! router in [`routes`] exposes a streaming chat endpoint plus status,
//! fragment and audio lookups.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Dev-dependencies used only by the integration tests under tests/
#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use bytes as _;
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use tower as _;

// Used by main.rs binary
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod sse;
pub mod state;

pub use bootstrap::{
    AxumContext, CorsConfig, GeneratorConfig, ProviderEndpoint, ServerConfig, bootstrap,
    start_server,
};
pub use config::ServerArgs;
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
