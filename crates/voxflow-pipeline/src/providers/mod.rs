//! Speech synthesis providers, the fallback chain and the audio store.

mod chain;
mod http;
mod silence;
mod store;

pub use chain::{ProviderChain, Synthesis};
pub use http::{HttpSpeechProvider, shared_client};
pub use silence::{SilenceProvider, silent_wav};
pub use store::{AUDIO_ROUTE_PREFIX, AudioStore, StoredAudio, cache_key};
