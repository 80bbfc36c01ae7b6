use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::media::MediaError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 400 with a machine-readable code plus the human reason
    #[error("Invalid input: {code}: {reason}")]
    Invalid { code: &'static str, reason: String },

    #[error("Upload error: {0}")]
    Upload(#[from] MediaError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!(msg)),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, json!("Unauthorized")),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!(msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            AppError::Invalid { code, reason } => (
                StatusCode::BAD_REQUEST,
                json!({ "code": code, "reason": reason }),
            ),
            AppError::Upload(e) => {
                tracing::error!("Media upload failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Image upload failed"),
                )
            }
            AppError::Multipart(e) => {
                tracing::warn!("Rejected multipart body: {}", e);
                (e.status(), json!(e.body_text()))
            }
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Join(_)
            | AppError::Hash(_)
            | AppError::Io(_)
            | AppError::Internal(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Internal server error"),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
