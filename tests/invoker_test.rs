// tests/invoker_test.rs: structured output, correction turns and cancellation

mod common;

use std::{sync::Arc, time::Duration};

use pretty_assertions::assert_eq;
use serde_json::json;

use common::*;
use gemini_flows::{
    cancel::CancelToken,
    invoker::{GenerationRequest, PromptPart, SamplingParams},
    models::Response,
    schema::ViolationKind,
    Field, FlowError, ModelBackend, ModelInvoker, Shape,
};

fn candidate() -> Shape {
    Shape::object([Field::required("candidate", Shape::string())])
}

fn structured(shape: Shape) -> GenerationRequest {
    GenerationRequest::builder()
        .prompt(vec![PromptPart::text("Translate: Hola")])
        .system("You are an expert translator.")
        .model("gemini-2.0-flash-lite")
        .sampling(SamplingParams::with_temperature(Some(0.3)))
        .output(shape)
        .build()
}

#[tokio::test]
async fn native_schema_and_sampling_are_sent_without_tools() {
    let backend = ScriptedBackend::new([answer(json!({ "candidate": "Hello" }))]);

    let result = invoker(&backend)
        .generate(structured(candidate()), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.output, Some(json!({ "candidate": "Hello" })));
    assert_eq!(result.text, None);

    let (model, sent) = &backend.requests()[0];
    assert_eq!(model, "gemini-2.0-flash-lite");
    assert_eq!(sent["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(sent["generationConfig"]["temperature"], json!(0.3f32));
    assert!(sent["generationConfig"]["responseSchema"]["properties"]
        .get("candidate")
        .is_some());
    assert_eq!(
        sent["systemInstruction"]["parts"][0]["text"],
        "You are an expert translator."
    );
    assert!(sent.get("tools").is_none());
}

#[tokio::test]
async fn nonconforming_answer_triggers_a_correction_turn() {
    let backend = ScriptedBackend::new([
        text("Sure! The translation is Hello."),
        answer(json!({ "candidate": "Hello" })),
    ]);

    let result = invoker(&backend)
        .generate(structured(candidate()), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.output, Some(json!({ "candidate": "Hello" })));
    assert_eq!(backend.calls(), 2);
    let correction = backend.last_user_text(1);
    assert!(correction.contains("did not match the required output schema"));
    assert!(correction.contains("$: response is not valid JSON"));
}

#[tokio::test]
async fn fenced_json_is_accepted() {
    let backend = ScriptedBackend::new([text("```json\n{\"candidate\": \"Hello\"}\n```")]);

    let result = invoker(&backend)
        .generate(structured(candidate()), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.output, Some(json!({ "candidate": "Hello" })));
}

#[tokio::test]
async fn correction_attempts_are_bounded() {
    let backend = ScriptedBackend::new([
        answer(json!({ "translation": "Hello" })),
        answer(json!({ "candidate": 42 })),
    ]);

    let err = invoker(&backend)
        .with_limits(20, 1)
        .generate(structured(candidate()), &CancelToken::new())
        .await
        .unwrap_err();

    match err {
        FlowError::SchemaConformance {
            attempts,
            violations,
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(
                violations[0].kind,
                ViolationKind::TypeMismatch {
                    expected: "string",
                    found: "number"
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn nullable_shape_accepts_null_and_empty_answers() {
    for reply in ["null", ""] {
        let backend = ScriptedBackend::new([text(reply)]);
        let result = invoker(&backend)
            .generate(structured(candidate().nullable()), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.output, Some(serde_json::Value::Null));
    }
}

#[tokio::test]
async fn nullable_shape_still_rejects_json_of_the_wrong_shape() {
    let backend = ScriptedBackend::new([
        text("I cannot translate that."),
        answer(json!({ "translation": "Hello" })),
    ]);
    let err = invoker(&backend)
        .with_limits(20, 1)
        .generate(structured(candidate().nullable()), &CancelToken::new())
        .await
        .unwrap_err();

    match err {
        FlowError::SchemaConformance {
            attempts,
            violations,
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(violations[0].kind, ViolationKind::MissingField);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn media_parts_and_inline_images_are_mapped() {
    let image: Response = serde_json::from_value(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }]
            }
        }]
    }))
    .unwrap();
    let backend = ScriptedBackend::new([image]);
    let request = GenerationRequest::builder()
        .prompt(vec![
            PromptPart::text("transcribe this video"),
            PromptPart::media_url("https://cdn.example.com/talk.mp4"),
        ])
        .model("gemini-2.5-flash")
        .build();

    let result = invoker(&backend)
        .generate(request, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.media_url.as_deref(), Some(IMAGE_URL));
    assert_eq!(result.text.as_deref(), Some(""));
    let (_, sent) = &backend.requests()[0];
    assert_eq!(
        sent["contents"][0]["parts"][1],
        json!({ "fileData": { "mimeType": "video/mp4", "fileUri": "https://cdn.example.com/talk.mp4" } })
    );
}

#[tokio::test]
async fn backend_failures_are_generation_errors() {
    let backend = ScriptedBackend::new(Vec::<Response>::new());

    let err = invoker(&backend)
        .generate(structured(candidate()), &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Generation(_)));
    assert!(err.to_string().contains("script exhausted"));
}

#[tokio::test]
async fn cancellation_interrupts_a_pending_model_call() {
    let backend: Arc<dyn ModelBackend> = Arc::new(PendingBackend);
    let invoker = ModelInvoker::new(backend);
    let cancel = CancelToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        invoker.generate(structured(candidate()), &cancel),
    )
    .await
    .expect("cancellation was not observed")
    .unwrap_err();

    assert!(matches!(err, FlowError::Cancelled));
}
