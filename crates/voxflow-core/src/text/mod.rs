//! Pure text utilities: boundary detection and speech sanitizing.

pub mod chunking;
pub mod speech;

pub use chunking::{
    DEFAULT_MAX_FRAGMENT_CHARS, DetectorConfig, collapse_whitespace, detect, detect_with,
    split_complete,
};
pub use speech::{is_speakable, speech_text};
