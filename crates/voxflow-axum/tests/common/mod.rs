//! Shared helpers for voxflow-axum route tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use futures_util::stream;
use http_body_util::BodyExt;
use voxflow_core::{
    GenerationRequest, GeneratorError, PipelineSettings, SynthesisProvider, TextGenerator,
    TokenStream,
};
use voxflow_pipeline::{SilenceProvider, SpeechPipeline};

use voxflow_axum::bootstrap::{AxumContext, CorsConfig};
use voxflow_axum::routes::create_router;

pub const REPLY: [&str; 6] = [
    "Hello there. ",
    "How are you ",
    "feeling today? ",
    "I am doing quite ",
    "well, thank ",
    "you.",
];

/// Replays fixed tokens and remembers the last request it was given.
pub struct ScriptedGenerator {
    tokens: Vec<String>,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
            last_request: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: GenerationRequest) -> Result<TokenStream, GeneratorError> {
        *self.last_request.lock().unwrap() = Some(request);
        let items: Vec<Result<String, GeneratorError>> =
            self.tokens.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Everything a route test needs to poke at.
pub struct TestApp {
    pub router: Router,
    pub pipeline: Arc<SpeechPipeline>,
    pub generator: Arc<ScriptedGenerator>,
}

pub fn app(tokens: &[&str]) -> TestApp {
    app_with(tokens, None)
}

pub fn app_with(tokens: &[&str], system_prompt: Option<&str>) -> TestApp {
    let providers: Vec<Arc<dyn SynthesisProvider>> = vec![Arc::new(SilenceProvider::default())];
    let pipeline = Arc::new(SpeechPipeline::new(providers, PipelineSettings::default()).unwrap());
    let generator = Arc::new(ScriptedGenerator::new(tokens));

    let ctx = AxumContext::new(Arc::clone(&pipeline), generator.clone())
        .with_system_prompt(system_prompt.map(str::to_string));
    let router = create_router(ctx, &CorsConfig::AllowAll);

    TestApp {
        router,
        pipeline,
        generator,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Assert the response body is valid JSON and return the parsed value.
pub async fn parse_json(response: Response) -> serde_json::Value {
    let body = body_bytes(response).await;
    serde_json::from_slice(&body).unwrap_or_else(|e| panic!("Expected valid JSON body: {e}"))
}

/// One decoded SSE message.
#[derive(Debug, Clone)]
pub struct SseMessage {
    pub event: String,
    pub data: serde_json::Value,
}

/// Read a finished SSE body into its messages, skipping keep-alive comments.
pub async fn read_sse(response: Response) -> Vec<SseMessage> {
    let body = body_bytes(response).await;
    let text = String::from_utf8(body.to_vec()).unwrap();

    text.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    event = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data = Some(serde_json::from_str(rest.trim()).unwrap());
                }
            }
            Some(SseMessage {
                event: event?,
                data: data?,
            })
        })
        .collect()
}

pub fn names(messages: &[SseMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.event.as_str()).collect()
}

pub fn of_kind<'a>(messages: &'a [SseMessage], event: &str) -> Vec<&'a serde_json::Value> {
    messages
        .iter()
        .filter(|m| m.event == event)
        .map(|m| &m.data)
        .collect()
}
