use super::{AuthError, TokenDirectory};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Where the token directory document lives.
#[derive(Debug, Clone)]
pub enum DirectorySource {
    File(PathBuf),
    Http(Url),
}

impl DirectorySource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            match Url::parse(source) {
                Ok(url) => return DirectorySource::Http(url),
                Err(e) => warn!("Invalid directory URL {}, treating as path: {}", source, e),
            }
        }
        DirectorySource::File(PathBuf::from(source))
    }

    pub fn as_file_path(&self) -> Option<&PathBuf> {
        match self {
            DirectorySource::File(path) => Some(path),
            DirectorySource::Http(_) => None,
        }
    }
}

/// Fetches the directory with a linearly increasing backoff: attempt n waits
/// n x the base delay before retrying.
pub struct DirectoryProvider {
    source: DirectorySource,
    http: reqwest::Client,
    retries: u32,
    base_delay: Duration,
}

impl DirectoryProvider {
    pub fn new(source: DirectorySource, retries: u32, base_delay: Duration) -> Self {
        Self {
            source,
            http: reqwest::Client::new(),
            retries,
            base_delay,
        }
    }

    pub fn source(&self) -> &DirectorySource {
        &self.source
    }

    pub async fn fetch(&self) -> Result<TokenDirectory, AuthError> {
        let attempts = self.retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.fetch_once().await {
                Ok(directory) => return Ok(directory),
                Err(e) => {
                    warn!("Token directory fetch attempt {} failed: {}", attempt, e);
                    last_error = e;
                    if attempt < attempts {
                        tokio::time::sleep(self.base_delay * attempt).await;
                    }
                }
            }
        }

        Err(AuthError::Connection(last_error))
    }

    async fn fetch_once(&self) -> Result<TokenDirectory, String> {
        match &self.source {
            DirectorySource::File(path) => TokenDirectory::load_from_file(path)
                .await
                .map_err(|e| format!("{}: {}", path.display(), e)),
            DirectorySource::Http(url) => {
                let response = self
                    .http
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| e.to_string())?;
                response
                    .json::<TokenDirectory>()
                    .await
                    .map_err(|e| e.to_string())
            }
        }
    }
}
