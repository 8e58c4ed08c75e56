use std::sync::Arc;

use async_trait::async_trait;
use minijinja::context;
use serde_json::Value;

use super::{text_input, video_shape, FlowDeps};
use crate::{
    config::ModelSettings,
    error::FlowError,
    flow::{Flow, FlowContext},
    invoker::{GenerationRequest, PromptPart, SamplingParams},
    prompt::{self, PromptLibrary},
    schema::{Field, Shape},
    tools::{ToolId, ToolRegistry},
};

/// Searches videos, transcribes them and writes an illustrated blog post.
pub struct VideoBlogFlow {
    input: Shape,
    output: Shape,
    model: ModelSettings,
    tools: ToolRegistry,
    prompts: Arc<PromptLibrary>,
}

impl VideoBlogFlow {
    /// Flow name.
    pub const NAME: &'static str = "videoBlogFlow";

    /// Builds the flow with all three tools.
    pub fn new(deps: &FlowDeps) -> Self {
        Self {
            input: text_input(),
            output: Shape::object([
                Field::required("videos", Shape::array(video_shape())),
                Field::required("blogTitle", Shape::string()),
                Field::required("blogContent", Shape::string()),
                Field::required("blogConclusions", Shape::string()),
                Field::required("blogReferences", Shape::string()),
                Field::required(
                    "blogImage",
                    Shape::string().describe("Value returned by createImageBlog"),
                ),
            ])
            .nullable(),
            model: deps.config.default_model.clone(),
            tools: deps.tools.subset(&[
                ToolId::SearchYoutubeVideos,
                ToolId::GetTranscription,
                ToolId::CreateImageBlog,
            ]),
            prompts: Arc::clone(&deps.prompts),
        }
    }
}

#[async_trait]
impl Flow for VideoBlogFlow {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn input_shape(&self) -> &Shape {
        &self.input
    }

    fn output_shape(&self) -> &Shape {
        &self.output
    }

    async fn run(&self, input: Value, context: &FlowContext) -> Result<Value, FlowError> {
        let text = input["text"].as_str().unwrap_or_default();
        let prompt = self
            .prompts
            .render(prompt::SEARCH_VIDEOS_BLOG, context! { text => text })?;

        let request = GenerationRequest::builder()
            .prompt(vec![PromptPart::text(prompt)])
            .model(self.model.model.clone())
            .sampling(SamplingParams::with_temperature(self.model.temperature))
            .output(self.output.clone())
            .tools(self.tools.clone())
            .build();
        let result = context.invoker.generate(request, &context.cancel).await?;
        Ok(result.output.unwrap_or(Value::Null))
    }
}
