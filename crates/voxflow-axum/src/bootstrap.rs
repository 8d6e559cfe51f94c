//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where the pipeline, the upstream text
//! generator and the synthesis providers are instantiated and wired
//! together for the web adapter.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use voxflow_core::{PipelineSettings, SynthesisProvider, TextGenerator};
use voxflow_pipeline::providers::shared_client;
use voxflow_pipeline::{HttpSpeechProvider, OpenAiChatGenerator, SilenceProvider, SpeechPipeline};

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Upstream OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Base URL; `/v1/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Used when a chat request carries no system prompt of its own.
    pub system_prompt: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            model: "default".to_string(),
            api_key: None,
            system_prompt: None,
        }
    }
}

/// A named HTTP speech-synthesis endpoint. Order in the config is the
/// fallback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    pub name: String,
    pub url: String,
}

impl ProviderEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub generator: GeneratorConfig,
    pub providers: Vec<ProviderEndpoint>,
    /// Append the offline silence provider as the last fallback.
    pub silence_fallback: bool,
    pub settings: PipelineSettings,
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Local development defaults: no HTTP providers, silence fallback on.
    pub fn with_defaults() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9890,
            generator: GeneratorConfig::default(),
            providers: Vec::new(),
            silence_fallback: true,
            settings: PipelineSettings::default(),
            cors: CorsConfig::default(),
        }
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }
}

/// Application context for the Axum adapter.
pub struct AxumContext {
    pub pipeline: Arc<SpeechPipeline>,
    pub generator: Arc<dyn TextGenerator>,
    /// Fallback system prompt for chat requests.
    pub system_prompt: Option<String>,
    pub started_at: Instant,
}

impl AxumContext {
    pub fn new(pipeline: Arc<SpeechPipeline>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            pipeline,
            generator,
            system_prompt: None,
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }
}

/// Build the provider chain order from the configured endpoints.
fn build_providers(
    config: &ServerConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn SynthesisProvider>> {
    let timeout = config.settings.provider_timeout();
    let mut providers: Vec<Arc<dyn SynthesisProvider>> = config
        .providers
        .iter()
        .map(|endpoint| {
            Arc::new(HttpSpeechProvider::new(
                endpoint.name.clone(),
                endpoint.url.clone(),
                client.clone(),
                timeout,
            )) as Arc<dyn SynthesisProvider>
        })
        .collect();

    if config.silence_fallback {
        providers.push(Arc::new(SilenceProvider::default()));
    }
    if providers.is_empty() {
        tracing::warn!(
            target: "voxflow.bootstrap",
            "No synthesis providers configured; every fragment will fail"
        );
    }
    providers
}

/// Bootstrap the pipeline and generator from configuration.
pub fn bootstrap(config: &ServerConfig) -> Result<AxumContext> {
    let client = shared_client().context("failed to build HTTP client")?;

    let providers = build_providers(config, &client);
    let pipeline = SpeechPipeline::new(providers, config.settings.clone())
        .context("failed to build speech pipeline")?;

    let generator = OpenAiChatGenerator::new(
        client,
        config.generator.base_url.clone(),
        config.generator.model.clone(),
    )
    .with_api_key(config.generator.api_key.clone());

    tracing::info!(
        target: "voxflow.bootstrap",
        generator_url = %config.generator.base_url,
        model = %config.generator.model,
        providers = ?pipeline.provider_names(),
        "Axum bootstrap complete"
    );

    Ok(
        AxumContext::new(Arc::new(pipeline), Arc::new(generator))
            .with_system_prompt(config.generator.system_prompt.clone()),
    )
}

/// Start the web server and serve until `shutdown` is cancelled.
pub async fn start_server(config: ServerConfig, shutdown: CancellationToken) -> Result<()> {
    use tokio::net::TcpListener;

    let ctx = bootstrap(&config)?;
    let app = crate::routes::create_router(ctx, &config.cors);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local: SocketAddr = listener.local_addr()?;

    tracing::info!(target: "voxflow.bootstrap", "voxflow server listening on http://{local}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!(target: "voxflow.bootstrap", "voxflow server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_fallback_is_last_in_chain() {
        let mut config = ServerConfig::with_defaults();
        config.providers = vec![
            ProviderEndpoint::new("primary", "http://127.0.0.1:1/tts"),
            ProviderEndpoint::new("backup", "http://127.0.0.1:2/tts"),
        ];

        let ctx = bootstrap(&config).unwrap();
        assert_eq!(
            ctx.pipeline.provider_names(),
            vec!["primary", "backup", "silence"]
        );
    }

    #[test]
    fn without_fallback_only_http_providers_remain() {
        let mut config = ServerConfig::with_defaults();
        config.silence_fallback = false;
        config.providers = vec![ProviderEndpoint::new("only", "http://127.0.0.1:1/tts")];

        let ctx = bootstrap(&config).unwrap();
        assert_eq!(ctx.pipeline.provider_names(), vec!["only"]);
    }

    #[test]
    fn invalid_settings_fail_bootstrap() {
        let mut config = ServerConfig::with_defaults();
        config.settings.audio_cache_entries = 0;
        assert!(bootstrap(&config).is_err());
    }

    #[test]
    fn context_carries_generator_model_and_prompt() {
        let mut config = ServerConfig::with_defaults();
        config.generator.model = "tiny".into();
        config.generator.system_prompt = Some("Be brief.".into());

        let ctx = bootstrap(&config).unwrap();
        assert_eq!(ctx.generator.model(), "tiny");
        assert_eq!(ctx.system_prompt.as_deref(), Some("Be brief."));
    }
}
