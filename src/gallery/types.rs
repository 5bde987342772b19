use serde::{Deserialize, Serialize};

/// One photo in a loaded working set. Rebuilt from manifests whenever a
/// session loads; the id is unique within one working set.
#[derive(Debug, Clone, Serialize)]
pub struct Photo {
    pub id: String,
    pub name: String,
    pub album: String,
    pub url: String,
    pub thumbnail_url: String,
    pub preview_url: String,
    pub date_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip)]
    pub ingest_index: usize,
}

/// One element of a per-album manifest. Field names follow the JSON the sync
/// tool writes and the legacy hand-maintained files use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "nome")]
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(rename = "descricao", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Derived album grouping; recomputed from the photo set, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AlbumSummary {
    pub name: String,
    pub count: usize,
    pub cover: Photo,
    pub photos: Vec<Photo>,
}

/// The active gallery view. Selection is only available in the concrete
/// photo views, not while browsing the album list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    Albums,
    All,
    Album(String),
    Search(String),
}

impl ViewMode {
    pub fn allows_selection(&self) -> bool {
        !matches!(self, ViewMode::Albums)
    }
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub mode: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumsQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotosQuery {
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GalleryPageQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub selected: usize,
    pub ids: Vec<String>,
}
