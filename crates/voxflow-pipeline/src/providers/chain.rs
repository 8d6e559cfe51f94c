//! Ordered provider fallback.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use voxflow_core::{
    AudioRef, ProviderError, SynthesisError, SynthesisProvider, SynthesisRequest, SynthesizedAudio,
};

use super::store::{AudioStore, StoredAudio, cache_key};

/// Result of a successful chain call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub audio_ref: AudioRef,
    /// Provider that produced the audio (for cache hits, the original one).
    pub provider: String,
    pub cached: bool,
}

/// Tries each provider in order until one produces audio.
///
/// Every call is bounded by the per-call timeout. Successful results are
/// written to the [`AudioStore`], which is consulted before any provider.
pub struct ProviderChain {
    providers: Vec<Arc<dyn SynthesisProvider>>,
    per_call_timeout: Duration,
    store: Arc<AudioStore>,
}

impl ProviderChain {
    pub fn new(
        providers: Vec<Arc<dyn SynthesisProvider>>,
        per_call_timeout: Duration,
        store: Arc<AudioStore>,
    ) -> Self {
        Self {
            providers,
            per_call_timeout,
            store,
        }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub const fn store(&self) -> &Arc<AudioStore> {
        &self.store
    }

    pub async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> Result<Synthesis, SynthesisError> {
        let key = cache_key(text, voice);
        if let Some(hit) = self.store.get(&key) {
            tracing::debug!(
                target: "voxflow.chain",
                provider = %hit.provider,
                "Synthesis cache hit"
            );
            return Ok(Synthesis {
                audio_ref: AudioStore::audio_ref_for(&key),
                provider: hit.provider,
                cached: true,
            });
        }

        let request = SynthesisRequest::new(text, voice.map(str::to_owned));
        let mut last = ProviderError::Unavailable("no providers configured".to_string());

        for (attempt, provider) in self.providers.iter().enumerate() {
            match self.call(provider.as_ref(), &request).await {
                Ok(audio) => {
                    let name = provider.name().to_string();
                    let audio_ref = self.store.insert(
                        key,
                        StoredAudio {
                            data: audio.data,
                            content_type: audio.content_type,
                            provider: name.clone(),
                            created_at: Utc::now(),
                        },
                    );
                    return Ok(Synthesis {
                        audio_ref,
                        provider: name,
                        cached: false,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        target: "voxflow.chain",
                        provider = provider.name(),
                        attempt = attempt + 1,
                        error = %err,
                        "Provider failed"
                    );
                    last = err;
                }
            }
        }

        Err(SynthesisError::AllProvidersExhausted {
            attempts: self.providers.len(),
            last,
        })
    }

    async fn call(
        &self,
        provider: &dyn SynthesisProvider,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, ProviderError> {
        tokio::time::timeout(self.per_call_timeout, provider.synthesize(request))
            .await
            .unwrap_or(Err(ProviderError::Timeout(self.per_call_timeout)))
    }
}
