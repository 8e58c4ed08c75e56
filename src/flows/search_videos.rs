use std::sync::Arc;

use async_trait::async_trait;
use minijinja::context;
use serde_json::Value;
use tracing::debug;

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

/// Two sequential calls: pick videos with the search tool, then write an article.
pub struct SearchVideosFlow {
    input: Shape,
    videos: Shape,
    article: Shape,
    output: Shape,
    model: ModelSettings,
    tools: ToolRegistry,
    prompts: Arc<PromptLibrary>,
}

impl SearchVideosFlow {
    /// Flow name.
    pub const NAME: &'static str = "searchVideosFlow";

    /// Builds the flow; only the first step sees the search tool.
    pub fn new(deps: &FlowDeps) -> Self {
        let article = Shape::object([
            Field::required("title", Shape::string()),
            Field::required("introduction", Shape::string()),
            Field::required("body", Shape::string()),
            Field::required("conclusions", Shape::string()),
            Field::required("youtubeVideos", Shape::array(video_shape())),
        ]);
        Self {
            input: text_input(),
            videos: Shape::array(video_shape()).nullable(),
            output: article.clone().nullable(),
            article,
            model: deps.config.default_model.clone(),
            tools: deps.tools.subset(&[ToolId::SearchYoutubeVideos]),
            prompts: Arc::clone(&deps.prompts),
        }
    }

    fn request(&self, prompt: String, output: Shape) -> GenerationRequest {
        GenerationRequest::builder()
            .prompt(vec![PromptPart::text(prompt)])
            .model(self.model.model.clone())
            .sampling(SamplingParams::with_temperature(self.model.temperature))
            .output(output)
            .build()
    }
}

#[async_trait]
impl Flow for SearchVideosFlow {
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
            .render(prompt::SEARCH_VIDEOS, context! { text => text })?;
        let mut search = self.request(prompt, self.videos.clone());
        search.tools = Some(self.tools.clone());
        let videos = context
            .invoker
            .generate(search, &context.cancel)
            .await?
            .output
            .unwrap_or(Value::Null);
        debug!(
            flow = Self::NAME,
            videos = videos.as_array().map_or(0, Vec::len),
            "recommended videos selected"
        );

        let prompt = self.prompts.render(
            prompt::ARTICLE,
            context! { text => text, videos => videos.to_string() },
        )?;
        let article = context
            .invoker
            .generate(self.request(prompt, self.article.clone()), &context.cancel)
            .await?;
        Ok(article.output.unwrap_or(Value::Null))
    }
}
