use super::DownloadError;
use crate::gallery::Photo;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Seam for fetching photo bytes, so the manager can be exercised without a
/// network.
#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(retries: u32, retry_delay: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            retries,
            retry_delay,
        }
    }
}

#[async_trait]
impl PhotoFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let attempts = self.retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let result = async {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<_, reqwest::Error>(response.bytes().await?.to_vec())
            }
            .await;

            match result {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!("Fetch attempt {} for {} failed: {}", attempt, url, e);
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(DownloadError::Fetch(format!("{}: {}", url, last_error)))
    }
}

/// Ordered candidate sources for a photo, best quality first: a direct
/// drive-download variant when one can be derived, then the stored URL, then
/// preview and thumbnail.
pub fn source_candidates(photo: &Photo) -> Vec<String> {
    let mut candidates = Vec::new();

    if photo.url.contains("drive.google.com")
        && photo.url.contains("id=")
        && !photo.url.contains("export=download")
    {
        candidates.push(format!("{}&export=download", photo.url));
    }

    candidates.push(photo.url.clone());
    candidates.push(photo.preview_url.clone());
    candidates.push(photo.thumbnail_url.clone());

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|url| !url.is_empty() && seen.insert(url.clone()));
    candidates
}
