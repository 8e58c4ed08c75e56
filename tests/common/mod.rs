//! Shared helpers: a scripted model backend and counting stub collaborators.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use serde_json::{json, Value};

use gemini_flows::{
    flows::FlowDeps,
    models::{Request, Response},
    prompt::PromptLibrary,
    services::{ImageGenerator, ImageSink, Transcriber, VideoSearch},
    ClientError, Config, ModelBackend, ModelInvoker, ToolRegistry,
};

/// Replays canned responses in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl ScriptedBackend {
    pub fn new(responses: impl IntoIterator<Item = Response>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::default(),
        })
    }

    /// `(model, serialized request)` pairs, in call order.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Text of every part of the last user turn of request `index`.
    pub fn last_user_text(&self, index: usize) -> String {
        let (_, request) = &self.requests()[index];
        let contents = request["contents"].as_array().unwrap();
        let user = contents
            .iter()
            .rev()
            .find(|content| content["role"] == "user")
            .unwrap();
        user["parts"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate_content(&self, model: &str, request: Request) -> Result<Response, ClientError> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), serde_json::to_value(&request)?));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::new("script exhausted"))
    }
}

/// Never answers.
pub struct PendingBackend;

#[async_trait]
impl ModelBackend for PendingBackend {
    async fn generate_content(&self, _model: &str, _request: Request) -> Result<Response, ClientError> {
        std::future::pending().await
    }
}

fn response(parts: Value) -> Response {
    serde_json::from_value(json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }]
    }))
    .unwrap()
}

/// A final answer consisting of `text`.
pub fn text(text: &str) -> Response {
    response(json!([{ "text": text }]))
}

/// A final answer carrying `value` as JSON text.
pub fn answer(value: Value) -> Response {
    text(&value.to_string())
}

/// A turn requesting the given function calls.
pub fn calls(calls: &[(&str, Value)]) -> Response {
    response(Value::Array(
        calls
            .iter()
            .map(|(name, args)| json!({ "functionCall": { "name": name, "args": args } }))
            .collect(),
    ))
}

pub fn invoker(backend: &Arc<ScriptedBackend>) -> ModelInvoker {
    let backend: Arc<dyn ModelBackend> = backend.clone();
    ModelInvoker::new(backend)
}

pub fn deps(tools: ToolRegistry) -> FlowDeps {
    FlowDeps {
        config: Config::default(),
        tools,
        prompts: Arc::new(PromptLibrary::builtin().unwrap()),
    }
}

pub const SEARCH_RESULTS: &str =
    r#"{"items":[{"id":{"videoId":"abc123"},"snippet":{"title":"Quantum Computers Explained"}}]}"#;

/// Counts queries and returns a fixed result, or fails when `fail` is set.
#[derive(Default)]
pub struct StubSearch {
    pub queries: Mutex<Vec<String>>,
    pub fail: bool,
}

impl StubSearch {
    pub fn count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoSearch for StubSearch {
    async fn search(&self, query: &str) -> anyhow::Result<String> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            anyhow::bail!("quota exceeded");
        }
        Ok(SEARCH_RESULTS.to_string())
    }
}

#[derive(Default)]
pub struct StubTranscriber {
    pub calls: AtomicUsize,
    pub content_types: Mutex<Vec<String>>,
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, url: &str, content_type: &str) -> anyhow::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.content_types
            .lock()
            .unwrap()
            .push(content_type.to_string());
        Ok(Some(format!("transcript of {url}")))
    }
}

pub const IMAGE_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

#[derive(Default)]
pub struct StubImages {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ImageGenerator for StubImages {
    async fn generate_image(&self, _prompt: &str) -> anyhow::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(IMAGE_URL.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub persisted: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageSink for RecordingSink {
    async fn persist(&self, data_url: &str) -> anyhow::Result<()> {
        self.persisted.lock().unwrap().push(data_url.to_string());
        Ok(())
    }
}
