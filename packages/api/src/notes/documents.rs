//! CRUD handlers shared by the `notes` and `pages` collections.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use store::{Document, DocumentKind, DocumentPatch, DocumentQuery, NewDocument};
use tracing::debug;

use super::NotesState;
use crate::error::ApiError;

const MAX_CONTENT_CHARS: usize = 100_000;
const MAX_TITLE_CHARS: usize = 200;
const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

pub(super) fn routes(kind: DocumentKind) -> Router<NotesState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{id}", get(read).put(update).delete(remove))
        .layer(Extension(kind))
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    owner_id: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    title: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    owner_id: Option<String>,
    limit: Option<usize>,
}

pub(super) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

pub(super) fn check_content(content: &str) -> Result<(), ApiError> {
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

fn check_title(title: &Option<String>) -> Result<(), ApiError> {
    match title {
        Some(title) if title.chars().count() > MAX_TITLE_CHARS => Err(ApiError::BadRequest(
            format!("title must be at most {MAX_TITLE_CHARS} characters"),
        )),
        _ => Ok(()),
    }
}

impl CreateRequest {
    fn validate(self) -> Result<NewDocument, ApiError> {
        let owner_id = self
            .owner_id
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .ok_or_else(|| ApiError::BadRequest("owner_id is required".to_string()))?;
        let content = self
            .content
            .ok_or_else(|| ApiError::BadRequest("content is required".to_string()))?;
        check_content(&content)?;
        check_title(&self.title)?;

        Ok(NewDocument {
            owner_id,
            title: self.title,
            content,
        })
    }
}

impl UpdateRequest {
    fn validate(self) -> Result<DocumentPatch, ApiError> {
        let patch = DocumentPatch {
            title: self.title,
            content: self.content,
        };
        if patch.is_empty() {
            return Err(ApiError::BadRequest(
                "update must include title or content".to_string(),
            ));
        }
        if let Some(content) = &patch.content {
            check_content(content)?;
        }
        check_title(&patch.title)?;
        Ok(patch)
    }
}

impl ListParams {
    fn into_query(self) -> Result<DocumentQuery, ApiError> {
        let limit = match self.limit {
            None => DEFAULT_LIST_LIMIT,
            Some(0) => return Err(ApiError::BadRequest("limit must be at least 1".to_string())),
            Some(n) => n.min(MAX_LIST_LIMIT),
        };
        Ok(DocumentQuery {
            owner_id: self.owner_id.filter(|o| !o.is_empty()),
            limit,
        })
    }
}

fn missing(kind: DocumentKind, id: &str) -> ApiError {
    ApiError::NotFound(format!("{} not found: {id}", kind.label()))
}

async fn create(
    State(state): State<NotesState>,
    Extension(kind): Extension<DocumentKind>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let new = json_body(payload)?.validate()?;
    let document = state
        .documents
        .create_document(kind, new, Utc::now())
        .await?;

    debug!(id = %document.id, "Created {}", kind.label());
    Ok((StatusCode::CREATED, Json(document)))
}

async fn list(
    State(state): State<NotesState>,
    Extension(kind): Extension<DocumentKind>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = params.into_query()?;
    Ok(Json(state.documents.list_documents(kind, &query).await?))
}

async fn read(
    State(state): State<NotesState>,
    Extension(kind): Extension<DocumentKind>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    state
        .documents
        .get_document(kind, &id)
        .await?
        .map(Json)
        .ok_or_else(|| missing(kind, &id))
}

async fn update(
    State(state): State<NotesState>,
    Extension(kind): Extension<DocumentKind>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Document>, ApiError> {
    let patch = json_body(payload)?.validate()?;
    state
        .documents
        .update_document(kind, &id, patch, Utc::now())
        .await?
        .map(Json)
        .ok_or_else(|| missing(kind, &id))
}

async fn remove(
    State(state): State<NotesState>,
    Extension(kind): Extension<DocumentKind>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.documents.delete_document(kind, &id).await? {
        debug!(id = %id, "Deleted {}", kind.label());
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(missing(kind, &id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_json, TestApp};
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::Request;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return (status, Value::Null);
        }
        (status, body_json(response).await)
    }

    #[tokio::test]
    async fn test_create_then_read_notes_and_pages() {
        let app = TestApp::new();
        for collection in ["notes", "pages"] {
            let (status, created) = send(
                &app.notes,
                "POST",
                &format!("/{collection}"),
                Some(json!({ "owner_id": "u1", "title": "Groceries", "content": "eggs" })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(created["content"], "eggs");

            let id = created["id"].as_str().unwrap();
            let (status, read) =
                send(&app.notes, "GET", &format!("/{collection}/{id}"), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(read, created);
        }
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let app = TestApp::new();
        let (_, created) = send(
            &app.notes,
            "POST",
            "/notes",
            Some(json!({ "owner_id": "u1", "content": "only a note" })),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let (status, _) = send(&app.notes, "GET", &format!("/pages/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_filters_by_owner_and_limits() {
        let app = TestApp::new();
        for (owner, content) in [("a", "1"), ("b", "2"), ("a", "3")] {
            send(
                &app.notes,
                "POST",
                "/notes",
                Some(json!({ "owner_id": owner, "content": content })),
            )
            .await;
        }

        let (status, listed) = send(&app.notes, "GET", "/notes?owner_id=a", None).await;
        assert_eq!(status, StatusCode::OK);
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|d| d["owner_id"] == "a"));

        let (_, limited) = send(&app.notes, "GET", "/notes?limit=1", None).await;
        assert_eq!(limited.as_array().unwrap().len(), 1);

        let (status, _) = send(&app.notes, "GET", "/notes?limit=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app.notes, "GET", "/notes?limit=many", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = TestApp::new();
        let (_, created) = send(
            &app.notes,
            "POST",
            "/pages",
            Some(json!({ "owner_id": "u1", "content": "draft" })),
        )
        .await;
        let uri = format!("/pages/{}", created["id"].as_str().unwrap());

        let (status, updated) =
            send(&app.notes, "PUT", &uri, Some(json!({ "content": "final" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["content"], "final");
        assert_eq!(updated["created_at"], created["created_at"]);

        let (status, _) = send(&app.notes, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app.notes, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().starts_with("page not found"));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_404() {
        let app = TestApp::new();
        let (status, _) = send(&app.notes, "GET", "/notes/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &app.notes,
            "PUT",
            "/notes/missing",
            Some(json!({ "title": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_payloads_are_400() {
        let app = TestApp::new();
        let long_title = "t".repeat(MAX_TITLE_CHARS + 1);
        let long_content = "c".repeat(MAX_CONTENT_CHARS + 1);
        let cases = [
            (json!({ "content": "x" }), "owner_id is required"),
            (json!({ "owner_id": "  ", "content": "x" }), "owner_id is required"),
            (json!({ "owner_id": "u1" }), "content is required"),
            (
                json!({ "owner_id": "u1", "content": long_content }),
                "content must be at most",
            ),
            (
                json!({ "owner_id": "u1", "content": "x", "title": long_title }),
                "title must be at most",
            ),
        ];
        for (body, message) in cases {
            let (status, response) = send(&app.notes, "POST", "/notes", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(response["error"].as_str().unwrap().starts_with(message));
        }

        let (status, response) =
            send(&app.notes, "POST", "/notes", Some(json!({ "owner_id": "u1", "content": 5 })))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let app = TestApp::new();
        let request = Request::post("/notes")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.notes.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_empty_update_is_400() {
        let app = TestApp::new();
        let (_, created) = send(
            &app.notes,
            "POST",
            "/notes",
            Some(json!({ "owner_id": "u1", "content": "x" })),
        )
        .await;
        let uri = format!("/notes/{}", created["id"].as_str().unwrap());
        let (status, _) = send(&app.notes, "PUT", &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let app = TestApp::new();
        let (status, body) = send(&app.notes, "DELETE", "/nothing/here", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "error": "Not Found", "path": "/nothing/here", "method": "DELETE" })
        );
    }
}
