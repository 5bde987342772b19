use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Sign in with your token to download photos")]
    NotAuthenticated,

    #[error("No photos selected")]
    SelectionEmpty,

    #[error("Failed to fetch {0}")]
    Fetch(String),

    #[error("None of the {attempted} photos could be fetched")]
    AllFailed { attempted: usize },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> Response {
        let status = match &self {
            DownloadError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            DownloadError::SelectionEmpty => StatusCode::BAD_REQUEST,
            DownloadError::Fetch(_) | DownloadError::AllFailed { .. } => StatusCode::BAD_GATEWAY,
            DownloadError::Archive(_) | DownloadError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
