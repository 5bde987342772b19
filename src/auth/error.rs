use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token not found")]
    NotFound,

    #[error("token deactivated")]
    Deactivated,

    #[error("token expired")]
    Expired,

    #[error("token directory unreachable: {0}")]
    Connection(String),

    #[error("{0}")]
    Validation(String),
}

impl AuthError {
    /// Message shown to the client entering a token.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::NotFound => {
                "Token not found. Check that you typed it exactly as received.".to_string()
            }
            AuthError::Deactivated => "Token deactivated. Please contact us.".to_string(),
            AuthError::Expired => {
                "Token expired. Ask the photographer for a new one.".to_string()
            }
            AuthError::Connection(_) => {
                "Connection problem. Check your internet and try again.".to_string()
            }
            AuthError::Validation(msg) => msg.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::NotFound | AuthError::Deactivated | AuthError::Expired => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), self.user_message()).into_response()
    }
}
