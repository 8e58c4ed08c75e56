//! Client implementation for the Gemini AI API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{
    config::Config,
    error::ClientError,
    invoker::ModelBackend,
    models::{PredictRequest, PredictResponse, Request, RequestType, Response},
    services::ImageGenerator,
};

/// Default API endpoint for Google's Generative AI service
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default API version
const DEFAULT_API_VERSION: &str = "v1beta";

/// A client for the Gemini `generateContent` and Imagen `predict` endpoints.
///
/// The client is cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GenerativeModel {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GenerativeModel {
    /// Creates a new client with the given API key against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Creates a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            api_key: config.google_api_key.clone().unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_url(&self, model: &str, request_type: RequestType) -> String {
        format!(
            "{}/{}/models/{}:{}",
            self.base_url, DEFAULT_API_VERSION, model, request_type
        )
    }

    /// Sends the HTTP request and decodes the JSON response.
    async fn send_request<B, T>(&self, url: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .query(&[("key", &self.api_key)])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ClientError::new(format!(
                "Request failed with status {}: {}",
                status, error_body
            )));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Generates content for a full request.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or if the response cannot be parsed.
    pub async fn generate_response(
        &self,
        model: &str,
        request: &Request,
    ) -> Result<Response, ClientError> {
        let url = self.build_url(model, RequestType::GenerateContent);
        debug!(model, turns = request.contents.len(), "calling generateContent");
        self.send_request(&url, request).await
    }

    /// Generates a single image and returns it as a `data:` URL.
    ///
    /// Returns `Ok(None)` when the model produced no image, e.g. because the prompt
    /// was filtered.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or if the response cannot be parsed.
    pub async fn predict_image(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<Option<String>, ClientError> {
        let url = self.build_url(model, RequestType::Predict);
        debug!(model, "calling predict");
        let response: PredictResponse = self
            .send_request(&url, &PredictRequest::single(prompt))
            .await?;
        Ok(response.first_data_url())
    }
}

#[async_trait]
impl ModelBackend for GenerativeModel {
    async fn generate_content(&self, model: &str, request: Request) -> Result<Response, ClientError> {
        self.generate_response(model, &request).await
    }
}

/// An [`ImageGenerator`] that calls an Imagen model through a [`GenerativeModel`].
#[derive(Debug, Clone)]
pub struct ImagenGenerator {
    client: GenerativeModel,
    model: String,
}

impl ImagenGenerator {
    /// Uses `model` (e.g. `imagen-3.0-generate-002`) through `client`.
    pub fn new(client: GenerativeModel, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ImageGenerator for ImagenGenerator {
    async fn generate_image(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(self.client.predict_image(&self.model, prompt).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_versioned_model_urls() {
        let client = GenerativeModel::new("key");
        assert_eq!(
            client.build_url("gemini-2.5-flash", RequestType::GenerateContent),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            client.build_url("imagen-3.0-generate-002", RequestType::Predict),
            "https://generativelanguage.googleapis.com/v1beta/models/imagen-3.0-generate-002:predict"
        );
    }
}
