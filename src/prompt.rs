//! Named prompt templates, resolved at call time.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::FlowError;

/// Single-video search and summary.
pub const VIDEO_SUMMARY: &str = "video_summary";
/// Video search returning a list of recommended videos.
pub const SEARCH_VIDEOS: &str = "search_videos";
/// Search, transcribe and illustrate a blog post.
pub const SEARCH_VIDEOS_BLOG: &str = "search_videos_2";
/// Article written from a topic and a list of videos.
pub const ARTICLE: &str = "article";
/// First translation prompt.
pub const TRANSLATE: &str = "translate";
/// Evaluation of a candidate translation.
pub const TRANSLATE_EVALUATE: &str = "translate_evaluate";
/// Translation prompt rebuilt from evaluator feedback.
pub const TRANSLATE_REVISE: &str = "translate_revise";

const BUILTIN: [(&str, &str); 7] = [
    (VIDEO_SUMMARY, include_str!("../prompts/video_summary.prompt")),
    (SEARCH_VIDEOS, include_str!("../prompts/search_videos.prompt")),
    (SEARCH_VIDEOS_BLOG, include_str!("../prompts/search_videos_2.prompt")),
    (ARTICLE, include_str!("../prompts/article.prompt")),
    (TRANSLATE, include_str!("../prompts/translate.prompt")),
    (TRANSLATE_EVALUATE, include_str!("../prompts/translate_evaluate.prompt")),
    (TRANSLATE_REVISE, include_str!("../prompts/translate_revise.prompt")),
];

/// A set of templates addressed by name. Referencing an undefined variable is an error.
#[derive(Debug)]
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    /// An empty library.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(false);
        Self { env }
    }

    /// A library holding the templates shipped in `prompts/`.
    ///
    /// # Errors
    ///
    /// Fails if a built-in template does not parse.
    pub fn builtin() -> Result<Self, FlowError> {
        let mut library = Self::new();
        for (name, source) in BUILTIN {
            library.add(name, source)?;
        }
        Ok(library)
    }

    /// Adds or replaces a template.
    ///
    /// # Errors
    ///
    /// Fails if `source` is not a valid template.
    pub fn add(&mut self, name: &'static str, source: &'static str) -> Result<(), FlowError> {
        self.env.add_template(name, source)?;
        Ok(())
    }

    /// Renders the template `name` with `context`.
    ///
    /// # Errors
    ///
    /// Fails if the template is unknown or references a missing variable.
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String, FlowError> {
        let rendered = self.env.get_template(name)?.render(context)?;
        Ok(rendered.trim().to_string())
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}
