//! # Notes service
//!
//! | Route | Method | Behavior |
//! |-------|--------|----------|
//! | `/`, `/ping` | GET | Hello / liveness |
//! | `/notes`, `/pages` | POST | Create, 201 with the stored document |
//! | `/notes`, `/pages` | GET | List, `?owner_id=&limit=` (default 50, max 200) |
//! | `/notes/{id}`, `/pages/{id}` | GET, PUT, DELETE | Read, update, delete by id |
//! | `/me/note` | GET, PUT, DELETE | The signed-in user's own note |
//!
//! Notes and pages share one set of handlers; the [`DocumentKind`] travels as a
//! request extension set on each nested router.

mod documents;
mod user_note;

use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use store::{DocumentKind, DocumentStore};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::auth::{session_layer, ReturnPolicy};
use crate::config::AppConfig;
use crate::routes::{not_found, ping};

/// Shared state for the notes service.
#[derive(Clone)]
pub struct NotesState {
    pub config: Arc<AppConfig>,
    pub documents: Arc<dyn DocumentStore>,
}

/// Build the notes router over the given session store.
pub fn notes_router<S>(state: NotesState, sessions: S) -> Router
where
    S: SessionStore + Clone,
{
    let sessions = session_layer(sessions, &state.config.cookie);
    let cors = cors_layer(state.config.return_policy.clone());

    Router::new()
        .route("/", get(hello))
        .route("/ping", get(ping))
        .nest("/notes", documents::routes(DocumentKind::Note))
        .nest("/pages", documents::routes(DocumentKind::Page))
        .route(
            "/me/note",
            get(user_note::get_note)
                .put(user_note::put_note)
                .delete(user_note::delete_note),
        )
        .fallback(not_found)
        .layer(sessions)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for browser clients on the trusted hosts.
fn cors_layer(policy: ReturnPolicy) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _| {
                origin
                    .to_str()
                    .map(|origin| policy.is_allowed(origin))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello from the ledd notes API" }))
}
