use super::SyncError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn default_dest() -> PathBuf {
    PathBuf::from("fotos")
}

fn default_true() -> bool {
    true
}

/// The sync job's JSON config. Field names are camelCase to stay compatible
/// with configs written for the previous tooling.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default)]
    pub root_folder_id: Option<String>,
    #[serde(default = "default_dest")]
    pub dest: PathBuf,
    /// `{id}` is replaced by the file id.
    #[serde(default)]
    pub url_template: Option<String>,
    #[serde(default)]
    pub thumbnail: ThumbnailRule,
    #[serde(default)]
    pub default_description: Option<String>,
    #[serde(default)]
    pub description_property_key: Option<String>,
    #[serde(default = "default_true")]
    pub only_images: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    /// File holding a bearer token for the drive API.
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailRule {
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub replace: Option<String>,
}

impl SyncConfig {
    pub async fn load(path: &Path) -> Result<Self, SyncError> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            SyncError::Config(format!("Config file not found: {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            SyncError::Config(format!("Could not parse {}: {}", path.display(), e))
        })
    }

    /// Photo URL for a drive file: the template when one is configured,
    /// otherwise the file's own links, otherwise the generic drive URL.
    pub fn build_url(
        &self,
        id: &str,
        web_content_link: Option<&str>,
        web_view_link: Option<&str>,
    ) -> String {
        if let Some(template) = &self.url_template {
            return template.replace("{id}", id);
        }
        if let Some(link) = web_content_link {
            return link.to_string();
        }
        if let Some(link) = web_view_link {
            return link.to_string();
        }
        format!("https://drive.google.com/uc?id={}", id)
    }

    pub fn build_thumbnail(
        &self,
        id: &str,
        photo_url: &str,
        thumbnail_link: Option<&str>,
    ) -> String {
        let strategy = self.thumbnail.strategy.as_deref().unwrap_or("drive");

        if strategy == "template"
            && let Some(template) = &self.thumbnail.template
        {
            return template.replace("{id}", id);
        }

        if strategy == "replace"
            && let (Some(search), Some(replace)) =
                (&self.thumbnail.search, &self.thumbnail.replace)
        {
            return photo_url.replace(search.as_str(), replace.as_str());
        }

        if let Some(link) = thumbnail_link {
            return link.to_string();
        }

        format!("https://drive.google.com/thumbnail?id={}&sz=w400", id)
    }

    /// Description for a file: its own, then the configured property keys,
    /// then the configured default.
    pub fn resolve_description(
        &self,
        description: Option<&str>,
        properties: Option<&HashMap<String, String>>,
    ) -> Option<String> {
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            return Some(description.to_string());
        }

        if let Some(properties) = properties {
            let keys = [
                self.description_property_key.as_deref(),
                Some("descricao"),
                Some("description"),
            ];
            for key in keys.into_iter().flatten() {
                if let Some(value) = properties.get(key).filter(|v| !v.is_empty()) {
                    return Some(value.clone());
                }
            }
        }

        self.default_description.clone()
    }
}
