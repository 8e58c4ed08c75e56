use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{OutputKind, Tool, ToolId};
use crate::{
    invoker::guess_media_type,
    schema::{Field, Shape},
    services::Transcriber,
};

/// `getTranscription {url}`: transcript text, or `null`.
pub struct GetTranscription {
    transcriber: Arc<dyn Transcriber>,
    input: Shape,
}

impl GetTranscription {
    /// Wraps a transcription collaborator.
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            input: Shape::object([Field::required("url", Shape::non_empty_string())]),
        }
    }
}

#[async_trait]
impl Tool for GetTranscription {
    fn id(&self) -> ToolId {
        ToolId::GetTranscription
    }

    fn description(&self) -> &str {
        "Get transcription from youtube"
    }

    fn input_shape(&self) -> &Shape {
        &self.input
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Shape(Shape::string().nullable())
    }

    async fn call(&self, input: Value) -> anyhow::Result<Value> {
        let url = input["url"].as_str().unwrap_or_default();
        let transcript = self
            .transcriber
            .transcribe(url, &guess_media_type(url))
            .await?;
        Ok(transcript.map(Value::String).unwrap_or(Value::Null))
    }
}
