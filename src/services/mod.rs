//! External collaborators used by the tools.
//!
//! Each collaborator is a trait so flows can be exercised with stubs; the default
//! implementations talk to YouTube, Gemini and the local filesystem.

mod image_sink;
mod transcription;
mod youtube;

use async_trait::async_trait;

pub use image_sink::{decode_data_url, FileImageSink};
pub use transcription::ModelTranscriber;
pub use youtube::YouTubeSearch;

/// Searches a video catalogue.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Returns the raw JSON metadata of the matching videos as text.
    async fn search(&self, query: &str) -> anyhow::Result<String>;
}

/// Produces transcripts of videos.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes the media at `url`; `None` when nothing could be transcribed.
    async fn transcribe(&self, url: &str, content_type: &str) -> anyhow::Result<Option<String>>;
}

/// Generates images from text prompts.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the generated image as a `data:` URL, or `None` when no image was produced.
    async fn generate_image(&self, prompt: &str) -> anyhow::Result<Option<String>>;
}

/// Stores generated images.
#[async_trait]
pub trait ImageSink: Send + Sync {
    /// Persists the image encoded in `data_url`.
    async fn persist(&self, data_url: &str) -> anyhow::Result<()>;
}
