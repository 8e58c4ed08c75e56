use std::path::PathBuf;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::info;

use super::ImageSink;

/// Splits a base64 `data:` URL into its MIME type and decoded bytes.
///
/// # Errors
///
/// Fails if the URL is not a base64 `data:` URL or the payload is not valid base64.
pub fn decode_data_url(url: &str) -> anyhow::Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URL has no payload"))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("only base64 data URLs are supported"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .context("invalid base64 payload")?;
    Ok((mime.to_string(), bytes))
}

/// [`ImageSink`] that writes each image to a fixed path, replacing earlier images.
#[derive(Debug, Clone)]
pub struct FileImageSink {
    path: PathBuf,
}

impl FileImageSink {
    /// Writes images to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageSink for FileImageSink {
    async fn persist(&self, data_url: &str) -> anyhow::Result<()> {
        let (mime, bytes) = decode_data_url(data_url)?;
        tokio::fs::write(&self.path, &bytes)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        info!(path = %self.path.display(), mime = %mime, bytes = bytes.len(), "image saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_data_urls() {
        let (mime, bytes) = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn rejects_other_urls() {
        assert!(decode_data_url("https://example.com/a.png").is_err());
        assert!(decode_data_url("data:text/plain,hello").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
    }

    #[tokio::test]
    async fn writes_decoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog-image.png");
        FileImageSink::new(&path)
            .persist("data:image/png;base64,aGVsbG8=")
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }
}
