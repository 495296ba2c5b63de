use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use store::StoreError;
use thiserror::Error;

/// Error returned by JSON handlers. Always rendered as `{"error": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Store(e) => {
                // Driver messages can carry hosts and ports; keep them in the logs.
                tracing::error!("Store error: {}", e);
                let status = match e {
                    StoreError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
                    StoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, "Database not available".to_string())
            }
            ApiError::Session(e) => {
                tracing::error!("Session error: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Session store not available".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
