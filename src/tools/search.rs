use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolId};
use crate::{
    schema::{Field, Shape},
    services::VideoSearch,
};

const DESCRIPTION: &str = "Searches YouTube for videos matching a specific query. Use this tool \
when the user explicitly asks for videos, visual tutorials, music, or general content \
consumption on YouTube. Returns a JSON string with video metadata (titles, IDs, snippets).";

/// `searchYoutubeVideos {text}`: raw search metadata as text.
pub struct SearchYoutubeVideos {
    search: Arc<dyn VideoSearch>,
    input: Shape,
}

impl SearchYoutubeVideos {
    /// Wraps a video search collaborator.
    pub fn new(search: Arc<dyn VideoSearch>) -> Self {
        Self {
            search,
            input: Shape::object([Field::required(
                "text",
                Shape::non_empty_string()
                    .describe("The search terms, keywords, or topic to find videos for."),
            )]),
        }
    }
}

#[async_trait]
impl Tool for SearchYoutubeVideos {
    fn id(&self) -> ToolId {
        ToolId::SearchYoutubeVideos
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn input_shape(&self) -> &Shape {
        &self.input
    }

    async fn call(&self, input: Value) -> anyhow::Result<Value> {
        let query = input["text"].as_str().unwrap_or_default();
        Ok(Value::String(self.search.search(query).await?))
    }
}
