// tests/flow_engine_test.rs: flow registration, input/output checks and the shipped flows

mod common;

use std::sync::{atomic::Ordering, Arc};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::*;
use gemini_flows::{
    cancel::CancelToken,
    flow::{Flow, FlowContext},
    flows,
    services::VideoSearch,
    tools::{CreateImageBlog, GetTranscription, SearchYoutubeVideos},
    Field, FlowEngine, FlowError, Shape, ToolRegistry,
};

struct Tools {
    search: Arc<StubSearch>,
    transcriber: Arc<StubTranscriber>,
    images: Arc<StubImages>,
    sink: Arc<RecordingSink>,
}

impl Tools {
    fn new() -> Self {
        Self {
            search: Arc::default(),
            transcriber: Arc::default(),
            images: Arc::default(),
            sink: Arc::default(),
        }
    }

    fn registry(&self) -> ToolRegistry {
        let search: Arc<dyn VideoSearch> = self.search.clone();
        ToolRegistry::new()
            .with(Arc::new(SearchYoutubeVideos::new(search)))
            .with(Arc::new(GetTranscription::new(self.transcriber.clone())))
            .with(Arc::new(CreateImageBlog::new(
                self.images.clone(),
                self.sink.clone(),
            )))
    }
}

fn engine(backend: &Arc<ScriptedBackend>, tools: &Tools) -> FlowEngine {
    let mut engine = FlowEngine::new(Arc::new(invoker(backend)));
    flows::register_all(&mut engine, &deps(tools.registry())).unwrap();
    engine
}

/// Always fails with an untyped error.
struct FailingFlow {
    shape: Shape,
}

#[async_trait]
impl Flow for FailingFlow {
    fn name(&self) -> &str {
        "failing"
    }

    fn input_shape(&self) -> &Shape {
        &self.shape
    }

    fn output_shape(&self) -> &Shape {
        &self.shape
    }

    async fn run(&self, _input: Value, _context: &FlowContext) -> Result<Value, FlowError> {
        Err(anyhow::anyhow!("body exploded").into())
    }
}

fn idle_backend() -> Arc<ScriptedBackend> {
    Arc::new(ScriptedBackend::default())
}

#[tokio::test]
async fn registers_the_four_flows_once() {
    let backend = idle_backend();
    let tools = Tools::new();
    let mut engine = engine(&backend, &tools);

    let names: Vec<String> = engine.flows().into_iter().map(|flow| flow.name).collect();
    assert_eq!(
        names,
        vec![
            "searchSummaryVideosFlow",
            "searchVideosFlow",
            "translationFlow",
            "videoBlogFlow"
        ]
    );

    let err = flows::register_all(&mut engine, &deps(tools.registry())).unwrap_err();
    assert!(matches!(err, FlowError::DuplicateFlow { ref name } if name == "searchSummaryVideosFlow"));
}

#[tokio::test]
async fn unknown_flow_is_reported() {
    let engine = FlowEngine::new(Arc::new(invoker(&idle_backend())));
    let err = engine.invoke("nope", json!({})).await.unwrap_err();
    assert!(matches!(err, FlowError::FlowNotFound { ref name } if name == "nope"));
}

#[tokio::test]
async fn invalid_input_never_reaches_the_body_or_the_model() {
    let backend = ScriptedBackend::new([text("unused")]);
    let tools = Tools::new();
    let engine = engine(&backend, &tools);

    let err = engine
        .invoke("translationFlow", json!({ "text": 5 }))
        .await
        .unwrap_err();

    match err {
        FlowError::InputInvalid { flow, violations } => {
            assert_eq!(flow, "translationFlow");
            assert_eq!(violations[0].to_string(), "$.text: expected string, found number");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.calls(), 0);
}

/// Returns a fixed value regardless of input.
struct ConstFlow {
    input: Shape,
    output: Shape,
    value: Value,
}

#[async_trait]
impl Flow for ConstFlow {
    fn name(&self) -> &str {
        "const"
    }

    fn input_shape(&self) -> &Shape {
        &self.input
    }

    fn output_shape(&self) -> &Shape {
        &self.output
    }

    async fn run(&self, _input: Value, _context: &FlowContext) -> Result<Value, FlowError> {
        Ok(self.value.clone())
    }
}

fn const_engine(value: Value) -> FlowEngine {
    let backend = idle_backend();
    let mut engine = FlowEngine::new(Arc::new(invoker(&backend)));
    engine
        .register(Arc::new(ConstFlow {
            input: Shape::object(Vec::new()),
            output: Shape::object([Field::required("answer", Shape::non_empty_string())])
                .nullable(),
            value,
        }))
        .unwrap();
    engine
}

#[tokio::test]
async fn output_schema_is_enforced_and_null_is_allowed_when_nullable() {
    let err = const_engine(json!({ "answer": "" }))
        .invoke("const", json!({}))
        .await
        .unwrap_err();
    match err {
        FlowError::OutputInvalid { flow, violations } => {
            assert_eq!(flow, "const");
            assert_eq!(violations[0].to_string(), "$.answer: must not be empty");
        }
        other => panic!("unexpected error: {other}"),
    }

    let output = const_engine(Value::Null)
        .invoke("const", json!({}))
        .await
        .unwrap();
    assert_eq!(output, Value::Null);

    let output = const_engine(json!({ "answer": "42", "extra": true }))
        .invoke("const", json!({}))
        .await
        .unwrap();
    assert_eq!(output, json!({ "answer": "42" }));
}

#[tokio::test]
async fn untyped_body_errors_become_flow_failures() {
    let mut engine = FlowEngine::new(Arc::new(invoker(&idle_backend())));
    engine
        .register(Arc::new(FailingFlow {
            shape: Shape::object(Vec::new()),
        }))
        .unwrap();

    let err = engine.invoke("failing", json!({})).await.unwrap_err();
    assert!(matches!(err, FlowError::FlowFailure(_)));
    assert!(err.to_string().contains("body exploded"));
}

#[tokio::test]
async fn cancelled_invocations_do_not_call_the_model() {
    let backend = ScriptedBackend::new([text("unused")]);
    let tools = Tools::new();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = engine(&backend, &tools)
        .invoke_with_cancel("searchSummaryVideosFlow", json!({ "text": "rust" }), cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Cancelled));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn single_video_flow_summarizes_the_best_match() {
    let summary = json!({
        "title": "Quantum Computers Explained",
        "summary": "Explains qubits and superposition.",
        "whyVideo": "Most viewed introduction to the topic.",
        "url": "https://www.youtube.com/watch?v=abc123"
    });
    let backend = ScriptedBackend::new([
        calls(&[("searchYoutubeVideos", json!({ "text": "Quantum Computing basics" }))]),
        text(&format!("```json\n{summary}\n```")),
    ]);
    let tools = Tools::new();

    let output = engine(&backend, &tools)
        .invoke(
            "searchSummaryVideosFlow",
            json!({ "text": "I want to learn about Quantum Computing basics." }),
        )
        .await
        .unwrap();

    assert_eq!(output, summary);
    for field in ["title", "summary", "whyVideo", "url"] {
        assert!(!output[field].as_str().unwrap().is_empty());
    }
    assert_eq!(tools.search.count(), 1);

    let requests = backend.requests();
    assert_eq!(requests[0].0, "gemini-2.5-flash");
    assert_eq!(requests[0].1["generationConfig"]["temperature"], json!(0.8f32));
    assert!(backend
        .last_user_text(0)
        .contains("topic given by user => I want to learn about Quantum Computing basics."));
    let declared: Vec<&str> = requests[0].1["tools"][0]["functionDeclarations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|declaration| declaration["name"].as_str().unwrap())
        .collect();
    assert_eq!(declared, vec!["searchYoutubeVideos"]);
}

#[tokio::test]
async fn single_video_flow_may_decline_with_null() {
    let backend = ScriptedBackend::new([
        answer(json!({ "title": "", "summary": "s", "whyVideo": "w", "url": "u" })),
        text("null"),
    ]);
    let tools = Tools::new();

    let output = engine(&backend, &tools)
        .invoke(
            "searchSummaryVideosFlow",
            json!({ "text": "I want to learn about Quantum Computing basics." }),
        )
        .await
        .unwrap();

    assert_eq!(output, Value::Null);
    assert!(backend.last_user_text(1).contains("$.title: must not be empty"));
}

#[tokio::test]
async fn single_video_flow_returns_null_when_the_model_only_answers_in_prose() {
    let decline = "I could not find any suitable video about that topic, sorry.";
    let backend = ScriptedBackend::new([text(decline), text(decline), text(decline)]);
    let tools = Tools::new();

    let output = engine(&backend, &tools)
        .invoke(
            "searchSummaryVideosFlow",
            json!({ "text": "I want to learn about Quantum Computing basics." }),
        )
        .await
        .unwrap();

    assert_eq!(output, Value::Null);
    assert_eq!(backend.calls(), 3);
    assert!(backend.last_user_text(2).contains("$: response is not valid JSON"));
}

#[tokio::test]
async fn video_blog_flow_uses_all_three_tools() {
    let video = |id: &str| {
        json!({
            "title": format!("Video {id}"),
            "description": "An overview.",
            "url": format!("https://www.youtube.com/watch?v={id}")
        })
    };
    let blog = json!({
        "videos": [video("a"), video("b")],
        "blogTitle": "Rust in Production",
        "blogContent": "Content.",
        "blogConclusions": "Conclusions.",
        "blogReferences": "References.",
        "blogImage": IMAGE_URL
    });
    let backend = ScriptedBackend::new([
        calls(&[("searchYoutubeVideos", json!({ "text": "rust in production" }))]),
        calls(&[
            ("getTranscription", json!({ "url": "https://www.youtube.com/watch?v=a" })),
            ("getTranscription", json!({ "url": "https://www.youtube.com/watch?v=b" })),
        ]),
        calls(&[("createImageBlog", json!({ "text": "a crab in a factory" }))]),
        answer(blog.clone()),
    ]);
    let tools = Tools::new();

    let output = engine(&backend, &tools)
        .invoke("videoBlogFlow", json!({ "text": "Rust in production" }))
        .await
        .unwrap();

    assert_eq!(output, blog);
    assert_eq!(tools.search.count(), 1);
    assert_eq!(tools.transcriber.calls.load(Ordering::SeqCst), 2);
    assert_eq!(tools.images.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*tools.sink.persisted.lock().unwrap(), vec![IMAGE_URL.to_string()]);
    assert_eq!(backend.calls(), 4);
}

#[tokio::test]
async fn search_videos_flow_feeds_the_selection_into_the_article() {
    let videos = json!([{
        "title": "Ownership in Rust",
        "description": "Borrowing explained.",
        "url": "https://www.youtube.com/watch?v=own"
    }]);
    let article = json!({
        "title": "Learning Rust",
        "introduction": "Intro.",
        "body": "Body.",
        "conclusions": "Done.",
        "youtubeVideos": videos.clone()
    });
    let backend = ScriptedBackend::new([
        calls(&[("searchYoutubeVideos", json!({ "text": "rust ownership" }))]),
        answer(videos.clone()),
        answer(article.clone()),
    ]);
    let tools = Tools::new();

    let output = engine(&backend, &tools)
        .invoke("searchVideosFlow", json!({ "text": "Rust ownership" }))
        .await
        .unwrap();

    assert_eq!(output, article);
    let requests = backend.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].1.get("tools").is_some());
    assert!(requests[2].1.get("tools").is_none());
    let prompt = backend.last_user_text(2);
    assert!(prompt.starts_with("Create an article related to this topic: Rust ownership"));
    assert!(prompt.contains("Ownership in Rust"));
}
