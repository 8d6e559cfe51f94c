//! HTTP speech provider.
//!
//! Posts `{text, voice, format}` JSON to a TTS endpoint and returns the
//! response body as audio. All providers share one pooled client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use voxflow_core::{ProviderError, SynthesisProvider, SynthesisRequest, SynthesizedAudio};

const DEFAULT_FORMAT: &str = "wav";

#[derive(Debug, Serialize)]
struct SpeechRequestBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    format: &'a str,
}

/// Build the shared client used by every HTTP provider.
pub fn shared_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .connect_timeout(Duration::from_secs(5))
        .build()
}

#[derive(Debug, Clone)]
pub struct HttpSpeechProvider {
    name: String,
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSpeechProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        client: reqwest::Client,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            client,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_transport_error(&self, err: &reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl SynthesisProvider for HttpSpeechProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let body = SpeechRequestBody {
            text: &request.text,
            voice: request.voice.as_deref(),
            format: DEFAULT_FORMAT,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(format!("{status}: {detail}")));
        }
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "upstream returned {status}"
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/wav")
            .to_string();
        let data = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        if data.is_empty() {
            return Err(ProviderError::Unavailable(
                "provider returned an empty body".to_string(),
            ));
        }

        tracing::debug!(
            target: "voxflow.provider",
            provider = %self.name,
            bytes = data.len(),
            "Synthesized fragment"
        );

        Ok(SynthesizedAudio { data, content_type })
    }
}
