//! Canonical event unions for the speech pipeline.
//!
//! # Structure
//!
//! - `chunk` - fragment lifecycle events published by the synthesis worker
//!   on the session event bus
//! - `stream` - events pushed to a client over its streaming transport
//!
//! # Wire Format
//!
//! Both unions serialize with a `type` tag:
//!
//! ```json
//! { "type": "audio_chunk", "fragmentId": "…", "sequence": 2, "audioRef": "/api/audio/…" }
//! ```

mod chunk;
mod stream;

pub use chunk::ChunkEvent;
pub use stream::{StreamEvent, StreamSummary};
