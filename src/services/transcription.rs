use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::Transcriber;
use crate::{
    cancel::CancelToken,
    config::ModelSettings,
    invoker::{GenerationRequest, ModelInvoker, PromptPart, SamplingParams},
};

/// [`Transcriber`] that asks a multimodal model to transcribe the video itself.
pub struct ModelTranscriber {
    invoker: Arc<ModelInvoker>,
    settings: ModelSettings,
}

impl ModelTranscriber {
    /// Transcribes with the model described by `settings`.
    pub fn new(invoker: Arc<ModelInvoker>, settings: ModelSettings) -> Self {
        Self { invoker, settings }
    }
}

#[async_trait]
impl Transcriber for ModelTranscriber {
    async fn transcribe(&self, url: &str, content_type: &str) -> anyhow::Result<Option<String>> {
        info!(url, "transcribing video");
        let request = GenerationRequest::builder()
            .prompt(vec![
                PromptPart::text("transcribe this video"),
                PromptPart::media(url, content_type),
            ])
            .model(self.settings.model.clone())
            .sampling(SamplingParams::with_temperature(self.settings.temperature))
            .build();
        let result = self.invoker.generate(request, &CancelToken::new()).await?;
        Ok(result.text.filter(|text| !text.trim().is_empty()))
    }
}
