//! Command-line and environment configuration for `voxflow-server`.
//!
//! Every flag has a `VOXFLOW_*` environment fallback so the server can be
//! configured entirely from a `.env` file.

use clap::Parser;
use thiserror::Error;
use voxflow_core::PipelineSettings;
use voxflow_core::settings::{
    DEFAULT_AUDIO_CACHE_ENTRIES, DEFAULT_DRAIN_TIMEOUT_MS, DEFAULT_MIN_FRAGMENT_CHARS,
    DEFAULT_PROVIDER_TIMEOUT_MS, DEFAULT_SESSION_IDLE_TIMEOUT_MS, DEFAULT_TRANSPORT_BUFFER,
};
use voxflow_core::text::DEFAULT_MAX_FRAGMENT_CHARS;

use crate::bootstrap::{CorsConfig, GeneratorConfig, ProviderEndpoint, ServerConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("provider '{0}' must be given as NAME=URL")]
    MalformedProvider(String),

    #[error("provider name '{0}' is used more than once")]
    DuplicateProvider(String),
}

/// Streaming speech server: relays an LLM reply as text and audio over SSE.
#[derive(Debug, Parser)]
#[command(name = "voxflow-server")]
#[command(about = "Stream LLM replies as text and synthesized speech")]
#[command(version)]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long, env = "VOXFLOW_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "VOXFLOW_PORT", default_value_t = 9890)]
    pub port: u16,

    /// Base URL of the OpenAI-compatible chat endpoint
    #[arg(long, env = "VOXFLOW_LLM_URL", default_value = "http://127.0.0.1:8080")]
    pub llm_url: String,

    /// Model name sent upstream
    #[arg(long, env = "VOXFLOW_LLM_MODEL", default_value = "default")]
    pub llm_model: String,

    /// Bearer token for the chat endpoint
    #[arg(long, env = "VOXFLOW_LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// System prompt for requests that do not bring their own
    #[arg(long, env = "VOXFLOW_SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// Speech provider as NAME=URL, in fallback order (repeatable)
    #[arg(
        long = "tts-provider",
        env = "VOXFLOW_TTS_PROVIDERS",
        value_delimiter = ','
    )]
    pub tts_providers: Vec<String>,

    /// Do not append the offline silence provider to the chain
    #[arg(long, env = "VOXFLOW_NO_SILENCE_FALLBACK")]
    pub no_silence_fallback: bool,

    /// Voice used when a request gives no hint
    #[arg(long, env = "VOXFLOW_DEFAULT_VOICE")]
    pub default_voice: Option<String>,

    #[arg(long, env = "VOXFLOW_MAX_FRAGMENT_CHARS", default_value_t = DEFAULT_MAX_FRAGMENT_CHARS)]
    pub max_fragment_chars: usize,

    #[arg(long, env = "VOXFLOW_MIN_FRAGMENT_CHARS", default_value_t = DEFAULT_MIN_FRAGMENT_CHARS)]
    pub min_fragment_chars: usize,

    #[arg(long, env = "VOXFLOW_PROVIDER_TIMEOUT_MS", default_value_t = DEFAULT_PROVIDER_TIMEOUT_MS)]
    pub provider_timeout_ms: u64,

    #[arg(long, env = "VOXFLOW_DRAIN_TIMEOUT_MS", default_value_t = DEFAULT_DRAIN_TIMEOUT_MS)]
    pub drain_timeout_ms: u64,

    #[arg(
        long,
        env = "VOXFLOW_SESSION_IDLE_TIMEOUT_MS",
        default_value_t = DEFAULT_SESSION_IDLE_TIMEOUT_MS
    )]
    pub session_idle_timeout_ms: u64,

    #[arg(long, env = "VOXFLOW_AUDIO_CACHE_ENTRIES", default_value_t = DEFAULT_AUDIO_CACHE_ENTRIES)]
    pub audio_cache_entries: usize,

    /// Events buffered per client before the session waits on it
    #[arg(long, env = "VOXFLOW_TRANSPORT_BUFFER", default_value_t = DEFAULT_TRANSPORT_BUFFER)]
    pub transport_buffer: usize,

    /// Allowed CORS origin (repeatable); all origins when omitted
    #[arg(long = "cors-origin", env = "VOXFLOW_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
}

impl ServerArgs {
    /// Resolve arguments into a [`ServerConfig`].
    ///
    /// Pipeline settings are not validated here; bootstrap rejects bad values.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let providers = parse_providers(&self.tts_providers)?;

        let settings = PipelineSettings {
            max_fragment_chars: self.max_fragment_chars,
            min_fragment_chars: self.min_fragment_chars,
            provider_timeout_ms: self.provider_timeout_ms,
            drain_timeout_ms: self.drain_timeout_ms,
            session_idle_timeout_ms: self.session_idle_timeout_ms,
            audio_cache_entries: self.audio_cache_entries,
            transport_buffer: self.transport_buffer,
            default_voice: self.default_voice,
        };

        let cors = if self.cors_origins.is_empty() {
            CorsConfig::AllowAll
        } else {
            CorsConfig::AllowOrigins(self.cors_origins)
        };

        Ok(ServerConfig {
            host: self.host,
            port: self.port,
            generator: GeneratorConfig {
                base_url: self.llm_url,
                model: self.llm_model,
                api_key: self.llm_api_key,
                system_prompt: self.system_prompt,
            },
            providers,
            silence_fallback: !self.no_silence_fallback,
            settings,
            cors,
        })
    }
}

fn parse_providers(raw: &[String]) -> Result<Vec<ProviderEndpoint>, ConfigError> {
    let mut providers: Vec<ProviderEndpoint> = Vec::with_capacity(raw.len());

    for entry in raw.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        let Some((name, url)) = entry.split_once('=') else {
            return Err(ConfigError::MalformedProvider(entry.to_string()));
        };
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || url.is_empty() {
            return Err(ConfigError::MalformedProvider(entry.to_string()));
        }
        if providers.iter().any(|p| p.name == name) {
            return Err(ConfigError::DuplicateProvider(name.to_string()));
        }
        providers.push(ProviderEndpoint::new(name, url));
    }

    Ok(providers)
}
