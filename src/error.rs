//! Route-level error taxonomy.
//!
//! Component errors are converted into [`AppError`] at the HTTP boundary.
//! Upstream and persistence failures reach the client only as a short,
//! generic message; their details go to the log.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// No session, or an invalid one.
    #[error("Unauthorized")]
    Unauthorized,

    /// The session is fine but there is no usable Spotify token on file.
    #[error("Spotify not connected")]
    SpotifyNotConnected,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotImplemented(String),

    /// LLM, metadata, auth provider or platform API failure.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Persistence(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::SpotifyNotConnected => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Upstream(_) | AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
