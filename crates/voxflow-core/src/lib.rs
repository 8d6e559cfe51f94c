//! Core domain types, events, ports and text utilities for voxflow.
//!
//! This crate has no I/O. It defines what a streaming session, a fragment
//! and a lifecycle event are, the traits the pipeline needs from its
//! collaborators, and the pure text functions used to cut generated text
//! into speakable fragments.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;
pub mod text;

pub use domain::{
    AudioRef, ErrorKind, Fragment, FragmentError, FragmentId, FragmentStatus, Session, SessionId,
    SessionState,
};
pub use events::{ChunkEvent, StreamEvent, StreamSummary};
pub use ports::{
    GenerationRequest, GeneratorError, ProviderError, SynthesisError, SynthesisProvider,
    SynthesisRequest, SynthesizedAudio, TextGenerator, TokenStream,
};
pub use settings::{
    DEFAULT_AUDIO_CACHE_ENTRIES, DEFAULT_MIN_FRAGMENT_CHARS, PipelineSettings, SettingsError,
};
