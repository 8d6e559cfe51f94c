//! Streaming speech pipeline.
//!
//! Turns an incrementally generated text reply into ordered speech-audio
//! fragments delivered to a live client as they become ready.
//!
//! # Components
//!
//! | Module          | Role                                                   |
//! |-----------------|--------------------------------------------------------|
//! | [`registry`]    | Authoritative fragment state, forward-only transitions |
//! | [`queue`]       | FIFO of pending fragments and the single worker        |
//! | [`providers`]   | Provider fallback chain, HTTP/silence providers, cache |
//! | [`bus`]         | Per-session fragment lifecycle pub/sub                 |
//! | [`orchestrator`]| Per-session state machine                              |
//! | [`generator`]   | OpenAI-compatible streaming text generator             |
//! | [`service`]     | `SpeechPipeline`, owning all of the above              |

pub mod bus;
mod error;
pub mod generator;
pub mod orchestrator;
pub mod providers;
pub mod queue;
pub mod registry;
pub mod service;

pub use bus::{SessionEventBus, Subscription, SubscriptionId};
pub use error::PipelineError;
pub use generator::OpenAiChatGenerator;
pub use orchestrator::{SessionOrchestrator, SessionOutcome};
pub use providers::{
    AudioStore, HttpSpeechProvider, ProviderChain, SilenceProvider, StoredAudio, Synthesis,
};
pub use queue::{QueuedFragment, SynthesisQueue, SynthesisWorker};
pub use registry::{ChunkRegistry, RegistryError, TransitionExtra};
pub use service::{PipelineStatus, SpeechPipeline};

