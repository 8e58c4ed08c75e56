use std::sync::Arc;

use async_trait::async_trait;
use minijinja::context;
use serde_json::Value;

use super::{text_input, FlowDeps};
use crate::{
    config::ModelSettings,
    error::FlowError,
    flow::{Flow, FlowContext},
    invoker::{GenerationRequest, PromptPart, SamplingParams},
    prompt::{self, PromptLibrary},
    schema::{Field, Shape},
    tools::{ToolId, ToolRegistry},
};

/// Finds the single best video on a topic and summarizes it.
pub struct VideoSummaryFlow {
    input: Shape,
    output: Shape,
    model: ModelSettings,
    tools: ToolRegistry,
    prompts: Arc<PromptLibrary>,
}

impl VideoSummaryFlow {
    /// Flow name.
    pub const NAME: &'static str = "searchSummaryVideosFlow";

    /// Builds the flow with the search tool only.
    pub fn new(deps: &FlowDeps) -> Self {
        Self {
            input: text_input(),
            output: Shape::object([
                Field::required("title", Shape::non_empty_string()),
                Field::required("summary", Shape::non_empty_string()),
                Field::required("whyVideo", Shape::non_empty_string()),
                Field::required("url", Shape::non_empty_string()),
            ])
            .nullable(),
            model: deps.config.default_model.clone(),
            tools: deps.tools.subset(&[ToolId::SearchYoutubeVideos]),
            prompts: Arc::clone(&deps.prompts),
        }
    }
}

#[async_trait]
impl Flow for VideoSummaryFlow {
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
            .render(prompt::VIDEO_SUMMARY, context! { text => text })?;

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
