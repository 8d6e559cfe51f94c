//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define what the pipeline expects from the outside world: a text
//! generator producing tokens and speech providers producing audio. They
//! carry no transport details; concrete adapters live in `voxflow-pipeline`.

pub mod synthesis;
pub mod text_generator;

pub use synthesis::{
    ProviderError, SynthesisError, SynthesisProvider, SynthesisRequest, SynthesizedAudio,
};
pub use text_generator::{GenerationRequest, GeneratorError, TextGenerator, TokenStream};
