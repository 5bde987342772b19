use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Set \"rootFolderId\" in the sync config")]
    MissingRootFolder,

    #[error("Drive API error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
