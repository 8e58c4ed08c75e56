use async_trait::async_trait;
use tracing::{debug, info};

use super::VideoSearch;

const SEARCH_URL: &str = "https://youtube.googleapis.com/youtube/v3/search";

/// [`VideoSearch`] backed by the YouTube Data API v3.
#[derive(Debug, Clone)]
pub struct YouTubeSearch {
    client: reqwest::Client,
    api_key: String,
    max_results: u32,
    base_url: String,
}

impl YouTubeSearch {
    /// Creates a search client returning up to `max_results` snippets per query.
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, max_results: u32) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            max_results,
            base_url: SEARCH_URL.to_string(),
        }
    }
}

#[async_trait]
impl VideoSearch for YouTubeSearch {
    async fn search(&self, query: &str) -> anyhow::Result<String> {
        info!(query, "searching YouTube");
        let max_results = self.max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("part", "snippet"),
                ("maxResults", max_results.as_str()),
                ("q", query),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        debug!(bytes = body.len(), "YouTube search finished");
        Ok(body)
    }
}
