//! OpenAI-compatible streaming chat generator.
//!
//! Posts `{model, messages, stream: true}` to `/v1/chat/completions` and
//! turns the SSE body (`data: {...}` lines ending with `data: [DONE]`) into
//! a stream of content tokens.

use std::fmt::Display;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use voxflow_core::{GenerationRequest, GeneratorError, TextGenerator, TokenStream};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Clone)]
pub struct OpenAiChatGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiChatGenerator {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for OpenAiChatGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, request: GenerationRequest) -> Result<TokenStream, GeneratorError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = request.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.message,
        });

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream: true,
        };

        let mut builder = self.client.post(self.completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GeneratorError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(target: "voxflow.generator", model = %self.model, "Upstream stream opened");
        Ok(Box::pin(sse_tokens(response.bytes_stream())))
    }
}

/// State threaded through the `unfold` stream.
struct SseState<S> {
    stream: S,
    buf: BytesMut,
    done: bool,
}

/// Parse an OpenAI-style SSE byte stream into content tokens.
///
/// Empty deltas and SSE comments are skipped. An upstream `error` object or
/// a transport failure ends the stream with an `Err`.
pub fn sse_tokens<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, GeneratorError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }

        loop {
            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end + 1);
                let line = String::from_utf8_lossy(&line);
                let trimmed = line.trim();

                if trimmed.is_empty() || trimmed.starts_with(':') {
                    continue;
                }
                let Some(data) = trimmed.strip_prefix("data:").map(str::trim) else {
                    continue;
                };
                if data == "[DONE]" {
                    return None;
                }

                match parse_chunk(data) {
                    Ok(Some(token)) => return Some((Ok(token), st)),
                    Ok(None) => continue,
                    Err(err) => {
                        st.done = true;
                        return Some((Err(err), st));
                    }
                }
            }

            match st.stream.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(GeneratorError::Connection(e.to_string())), st));
                }
                // Upstream closed without [DONE]; treat as a normal finish.
                None => return None,
            }
        }
    })
}

fn find_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

fn parse_chunk(data: &str) -> Result<Option<String>, GeneratorError> {
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(target: "voxflow.generator", error = %e, "Skipping unparseable SSE line");
            return Ok(None);
        }
    };

    if let Some(error) = value.get("error") {
        let message = error["message"]
            .as_str()
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(GeneratorError::Protocol(message));
    }

    Ok(value["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}
