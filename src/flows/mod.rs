//! The flows shipped with the binary.

mod search_videos;
mod translation;
mod video_blog;
mod video_summary;

use std::sync::Arc;

use crate::{
    config::Config,
    error::FlowError,
    flow::FlowEngine,
    prompt::PromptLibrary,
    schema::{Field, Shape},
    tools::ToolRegistry,
};

pub use search_videos::SearchVideosFlow;
pub use translation::{TranslationFlow, TRANSLATE_INSTRUCTION};
pub use video_blog::VideoBlogFlow;
pub use video_summary::VideoSummaryFlow;

/// Everything the flows are built from.
#[derive(Clone)]
pub struct FlowDeps {
    /// Model and loop settings.
    pub config: Config,
    /// Process-wide tool set; each flow takes the subset it needs.
    pub tools: ToolRegistry,
    /// Prompt templates.
    pub prompts: Arc<PromptLibrary>,
}

/// Registers all four flows on `engine`.
///
/// # Errors
///
/// Returns [`FlowError::DuplicateFlow`] if any of them is already registered.
pub fn register_all(engine: &mut FlowEngine, deps: &FlowDeps) -> Result<(), FlowError> {
    engine.register(Arc::new(VideoSummaryFlow::new(deps)))?;
    engine.register(Arc::new(VideoBlogFlow::new(deps)))?;
    engine.register(Arc::new(TranslationFlow::new(deps)))?;
    engine.register(Arc::new(SearchVideosFlow::new(deps)))?;
    Ok(())
}

/// `{text: string}`, the input of every flow.
pub(crate) fn text_input() -> Shape {
    Shape::object([Field::required("text", Shape::string())])
}

/// `{title, description, url}` of one recommended video.
pub(crate) fn video_shape() -> Shape {
    Shape::object([
        Field::required("title", Shape::string()),
        Field::required("description", Shape::string()),
        Field::required("url", Shape::string()),
    ])
}
