use super::{SyncConfig, SyncError};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const FILES_ENDPOINT: &str = "https://www.googleapis.com/drive/v3/files";
const FILE_FIELDS: &str = "nextPageToken, files(id, name, description, createdTime, \
                           modifiedTime, thumbnailLink, webViewLink, webContentLink, \
                           properties, mimeType)";
const PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub web_content_link: Option<String>,
    #[serde(default)]
    pub properties: Option<HashMap<String, String>>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<DriveFile>,
}

enum DriveAuth {
    ApiKey(String),
    Bearer(String),
    None,
}

/// Thin client over the drive files.list endpoint, following page tokens.
pub struct DriveClient {
    http: reqwest::Client,
    auth: DriveAuth,
}

impl DriveClient {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let auth = if let Some(path) = &config.credentials_file {
            let token = std::fs::read_to_string(path)
                .map_err(|e| {
                    SyncError::Config(format!(
                        "Could not read credentials file {}: {}",
                        path.display(),
                        e
                    ))
                })?
                .trim()
                .to_string();
            DriveAuth::Bearer(token)
        } else if let Some(key) = &config.api_key {
            DriveAuth::ApiKey(key.clone())
        } else {
            DriveAuth::None
        };

        Ok(Self {
            http: reqwest::Client::new(),
            auth,
        })
    }

    pub fn has_credentials(&self) -> bool {
        !matches!(self.auth, DriveAuth::None)
    }

    /// Child folders of the root: each one is an album.
    pub async fn list_folders(&self, parent_id: &str) -> Result<Vec<DriveFile>, SyncError> {
        let query = format!(
            "'{}' in parents and mimeType = 'application/vnd.google-apps.folder' \
             and trashed = false",
            parent_id
        );
        self.list(&query).await
    }

    /// Files within an album folder, optionally restricted to image types.
    pub async fn list_photos(
        &self,
        folder_id: &str,
        only_images: bool,
    ) -> Result<Vec<DriveFile>, SyncError> {
        let mut query = format!("'{}' in parents and trashed = false", folder_id);
        if only_images {
            query.push_str(" and mimeType contains 'image/'");
        }
        self.list(&query).await
    }

    async fn list(&self, query: &str) -> Result<Vec<DriveFile>, SyncError> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(FILES_ENDPOINT).query(&[
                ("q", query),
                ("fields", FILE_FIELDS),
                ("pageSize", &PAGE_SIZE.to_string()),
            ]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            match &self.auth {
                DriveAuth::ApiKey(key) => request = request.query(&[("key", key.as_str())]),
                DriveAuth::Bearer(token) => request = request.bearer_auth(token),
                DriveAuth::None => {}
            }

            let page: FileList = request
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            debug!("Drive page returned {} files", page.files.len());
            files.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }
}
