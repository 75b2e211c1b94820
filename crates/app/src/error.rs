use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use edu_core::model::ProgressError;
use serde_json::json;
use services::{CatalogServiceError, ProgressServiceError};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("lesson not found")]
    LessonNotFound,

    #[error("no progress recorded for this lesson")]
    ProgressNotFound,

    #[error(transparent)]
    Progress(#[from] ProgressServiceError),

    #[error(transparent)]
    Catalog(#[from] CatalogServiceError),
}

impl From<ProgressError> for AppError {
    fn from(err: ProgressError) -> Self {
        AppError::MalformedRequest(err.to_string())
    }
}

/// Unparsable bodies, bad ids and non-numeric scores all answer 400 in the
/// usual envelope instead of axum's plain-text 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedRequest(_)
            | AppError::Progress(ProgressServiceError::Progress(_)) => StatusCode::BAD_REQUEST,
            AppError::LessonNotFound | AppError::ProgressNotFound => StatusCode::NOT_FOUND,
            AppError::Progress(_) | AppError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Store errors are logged in full but answered generically.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
