//! Request and response models for the Imagen `predict` endpoint.

use serde::{Deserialize, Serialize};

/// A prediction request for an image model.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    /// One instance per prompt.
    pub instances: Vec<PredictInstance>,
    /// Generation parameters.
    pub parameters: PredictParameters,
}

impl PredictRequest {
    /// A request for a single image from `prompt`.
    pub fn single(prompt: impl Into<String>) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: prompt.into(),
            }],
            parameters: PredictParameters { sample_count: 1 },
        }
    }
}

/// The prompt of a prediction.
#[derive(Debug, Clone, Serialize)]
pub struct PredictInstance {
    /// Image description.
    pub prompt: String,
}

/// Prediction parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    /// Number of images to generate.
    pub sample_count: u32,
}

/// The response of the `predict` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictResponse {
    /// Generated images; may be empty when the prompt was filtered.
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// One generated image.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Base64 image bytes.
    pub bytes_base64_encoded: Option<String>,
    /// MIME type of the image.
    pub mime_type: Option<String>,
}

impl PredictResponse {
    /// The first image as a `data:` URL.
    pub fn first_data_url(&self) -> Option<String> {
        self.predictions.iter().find_map(|prediction| {
            let data = prediction.bytes_base64_encoded.as_deref()?;
            let mime = prediction.mime_type.as_deref().unwrap_or("image/png");
            Some(format!("data:{mime};base64,{data}"))
        })
    }
}
