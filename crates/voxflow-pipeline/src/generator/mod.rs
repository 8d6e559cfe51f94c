//! Concrete text generators.

mod openai;

pub use openai::{OpenAiChatGenerator, sse_tokens};
