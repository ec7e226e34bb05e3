use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure modes of the store, the creation service, the read-state manager
/// and the event listener.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The write went through but the read-back disagrees with what was written.
    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Subscription error: {0}")]
    Subscription(String),
}

impl From<validator::ValidationErrors> for NotificationError {
    fn from(err: validator::ValidationErrors) -> Self {
        NotificationError::Validation(err.to_string())
    }
}

impl From<sqlx::Error> for NotificationError {
    fn from(err: sqlx::Error) -> Self {
        NotificationError::Persistence(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Notification(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Notification(ref err) => match err {
                NotificationError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                NotificationError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                NotificationError::Persistence(msg) | NotificationError::Verification(msg) => {
                    tracing::error!("Store error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Notification store error occurred".to_string(),
                    )
                }
                NotificationError::Subscription(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            },
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
