//! Handlers shared by both routers.

use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

pub async fn ping() -> &'static str {
    "pong"
}

/// JSON 404 for any unmatched route.
pub async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}
