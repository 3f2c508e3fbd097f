use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Transport failure or non-2xx answer from the metadata API
    #[error("Metadata service unavailable: {0}")]
    MetadataUnavailable(String),

    /// Pick index or payload out of range for the current conversation
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Button tap with no live conversation able to handle it
    #[error("Session expired")]
    ExpiredSession,

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::MetadataUnavailable(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidSelection(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ExpiredSession => (StatusCode::GONE, self.to_string()),
            AppError::MetadataUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Storage(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
