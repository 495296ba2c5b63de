//! The per-user note, keyed by the Discord id of the signed-in user.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use store::UserNote;
use tower_sessions::Session;

use super::documents::{check_content, json_body};
use super::NotesState;
use crate::auth::current_session;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct NoteBody {
    content: Option<String>,
}

async fn require_user(session: &Session) -> Result<String, ApiError> {
    current_session(session, Utc::now())
        .await?
        .map(|auth| auth.discord_id)
        .ok_or(ApiError::Unauthorized)
}

pub(super) async fn get_note(
    State(state): State<NotesState>,
    session: Session,
) -> Result<Json<UserNote>, ApiError> {
    let user_id = require_user(&session).await?;
    state
        .documents
        .get_user_note(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No note saved".to_string()))
}

pub(super) async fn put_note(
    State(state): State<NotesState>,
    session: Session,
    payload: Result<Json<NoteBody>, JsonRejection>,
) -> Result<Json<UserNote>, ApiError> {
    let user_id = require_user(&session).await?;
    let content = json_body(payload)?
        .content
        .ok_or_else(|| ApiError::BadRequest("content is required".to_string()))?;
    check_content(&content)?;

    let note = state
        .documents
        .set_user_note(&user_id, &content, Utc::now())
        .await?;
    Ok(Json(note))
}

pub(super) async fn delete_note(
    State(state): State<NotesState>,
    session: Session,
) -> Result<StatusCode, ApiError> {
    let user_id = require_user(&session).await?;
    if state.documents.delete_user_note(&user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("No note saved".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{body_json, cookie, location, query_param, TestApp, GOOD_CODE};
    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    /// Sign in through the gateway and return the session cookie.
    async fn sign_in(app: &TestApp) -> String {
        let response = app
            .gateway
            .clone()
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let state = query_param(&location(&response), "state").unwrap();

        let response = app
            .gateway
            .clone()
            .oneshot(
                Request::get(format!("/callback?code={GOOD_CODE}&state={state}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        cookie(&response).unwrap()
    }

    #[tokio::test]
    async fn test_note_requires_session() {
        let app = TestApp::new();
        let response = app
            .notes
            .clone()
            .oneshot(Request::get("/me/note").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Not authenticated");
    }

    #[tokio::test]
    async fn test_note_roundtrip_with_gateway_session() {
        let app = TestApp::new();
        let session = sign_in(&app).await;

        let put = Request::put("/me/note")
            .header(COOKIE, &session)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "content": "remember the milk" }).to_string()))
            .unwrap();
        let response = app.notes.clone().oneshot(put).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["user_id"], "80351110224678912");

        let get = Request::get("/me/note")
            .header(COOKIE, &session)
            .body(Body::empty())
            .unwrap();
        let response = app.notes.clone().oneshot(get).await.unwrap();
        assert_eq!(body_json(response).await["content"], "remember the milk");

        let delete = |session: &str| {
            Request::delete("/me/note")
                .header(COOKIE, session)
                .body(Body::empty())
                .unwrap()
        };
        let response = app.notes.clone().oneshot(delete(&session)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.notes.clone().oneshot(delete(&session)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
