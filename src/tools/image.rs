use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{Tool, ToolId};
use crate::{
    schema::{Field, Shape},
    services::{ImageGenerator, ImageSink},
};

/// `createImageBlog {text}`: generates an illustration and returns its `data:` URL.
///
/// The image is handed to the [`ImageSink`] before the URL is returned. An empty
/// string is returned when the model produced no image.
pub struct CreateImageBlog {
    generator: Arc<dyn ImageGenerator>,
    sink: Arc<dyn ImageSink>,
    input: Shape,
}

impl CreateImageBlog {
    /// Wraps an image generator and the sink that stores its images.
    pub fn new(generator: Arc<dyn ImageGenerator>, sink: Arc<dyn ImageSink>) -> Self {
        Self {
            generator,
            sink,
            input: Shape::object([Field::required("text", Shape::non_empty_string())]),
        }
    }
}

#[async_trait]
impl Tool for CreateImageBlog {
    fn id(&self) -> ToolId {
        ToolId::CreateImageBlog
    }

    fn description(&self) -> &str {
        "Create an image based on a text"
    }

    fn input_shape(&self) -> &Shape {
        &self.input
    }

    async fn call(&self, input: Value) -> anyhow::Result<Value> {
        let text = input["text"].as_str().unwrap_or_default();
        info!(prompt = text, "creating blog image");
        let prompt = format!("An illustration for this blog post: {text}");

        let Some(url) = self.generator.generate_image(&prompt).await? else {
            return Ok(Value::String(String::new()));
        };
        self.sink.persist(&url).await?;
        Ok(Value::String(url))
    }
}
