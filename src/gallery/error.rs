use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("No manifest for album: {0}")]
    ManifestMissing(String),

    #[error("Unknown photo: {0}")]
    UnknownPhoto(String),

    #[error("Select photos from an album view first")]
    BrowseView,

    #[error("Session expired, enter your token again")]
    SessionExpired,
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let status = match &self {
            GalleryError::Io(_) | GalleryError::Manifest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GalleryError::ManifestMissing(_) | GalleryError::UnknownPhoto(_) => {
                StatusCode::NOT_FOUND
            }
            GalleryError::BrowseView => StatusCode::CONFLICT,
            GalleryError::SessionExpired => StatusCode::UNAUTHORIZED,
        };

        (status, self.to_string()).into_response()
    }
}
