//! # Gateway routes
//!
//! | Route | Method | Behavior |
//! |-------|--------|----------|
//! | `/` | GET | Landing page |
//! | `/ping` | GET | Liveness |
//! | `/login` | GET | Record a state token, 303 to Discord |
//! | `/callback` | GET | Validate state, exchange code, upsert user, start a session |
//! | `/session`, `/me` | GET | `{authenticated, user}` or 401 |
//! | `/logout` | POST | Revoke the session, then redirect or `{ok: true}` |
//! | `/logout` | GET | Revoke the session, always redirect |
//!
//! Callback failures never surface as error pages: the browser is sent to the
//! configured failure URL with an `error` code (`provider_denied`, `missing_code`,
//! `missing_state`, `invalid_state`, `oauth_error`, `session_error`).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::{ACCEPT, REFERER};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use store::{OAuthState, StateStore, UserProfile, UserStore};
use tower_http::trace::TraceLayer;
use tower_sessions::{Session, SessionStore};
use tracing::{debug, error, info, warn};

use super::config::AuthConfig;
use super::provider::IdentityProvider;
use super::session::{current_session, establish_session, session_layer};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::UserInfo;
use crate::routes::{not_found, ping};

const CONTINUE_HEADER: &str = "x-continue";

/// Shared state for the gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthConfig>,
    pub users: Arc<dyn UserStore>,
    pub states: Arc<dyn StateStore>,
    pub provider: Arc<dyn IdentityProvider>,
}

/// Build the gateway router over the given session store.
pub fn gateway_router<S>(state: GatewayState, sessions: S) -> Router
where
    S: SessionStore + Clone,
{
    let sessions = session_layer(sessions, &state.config.cookie);

    Router::new()
        .route("/", get(index))
        .route("/ping", get(ping))
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/session", get(session_status))
        .route("/me", get(session_status))
        .route("/logout", get(logout_redirect).post(logout))
        .fallback(not_found)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct ContinueParams {
    #[serde(rename = "continue")]
    continue_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn header(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn index() -> Html<&'static str> {
    Html("<h1>ledd auth gateway</h1><p><a href=\"/login\">Log in with Discord</a></p>")
}

async fn login(
    State(state): State<GatewayState>,
    Query(params): Query<ContinueParams>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let candidate = params
        .continue_to
        .or_else(|| header(&headers, CONTINUE_HEADER))
        .or_else(|| header(&headers, REFERER));
    let continue_to = state.config.return_policy.pick(candidate.as_deref());

    let request = state.provider.authorization_request();
    let now = Utc::now();
    state
        .states
        .save_state(&OAuthState {
            state: request.state,
            pkce_verifier: request.pkce_verifier,
            continue_to: Some(continue_to),
            created_at: now,
            expires_at: now + state.auth.state_ttl,
        })
        .await?;

    debug!("Issued OAuth state");
    Ok(Redirect::to(&request.url))
}

async fn callback(
    State(state): State<GatewayState>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let fail = |reason: &str| Redirect::to(&state.auth.failure_url(reason));

    if let Some(err) = params.error {
        warn!("Discord denied authorization: {}", err);
        return fail("provider_denied");
    }
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        warn!("Callback without code");
        return fail("missing_code");
    };
    let Some(token) = params.state.filter(|s| !s.is_empty()) else {
        warn!("Callback without state");
        return fail("missing_state");
    };

    let now = Utc::now();
    let pending = match state.states.consume_state(&token, now).await {
        Ok(Some(pending)) => pending,
        Ok(None) => {
            warn!("Invalid or expired OAuth state");
            return fail("invalid_state");
        }
        Err(e) => {
            error!("Failed to look up OAuth state: {}", e);
            return fail("session_error");
        }
    };

    let user = match complete_login(&state, &code, &pending, now).await {
        Ok(user) => user,
        Err(reason) => return fail(reason),
    };

    if let Err(e) =
        establish_session(&session, &user.discord_id, now, state.config.cookie.ttl()).await
    {
        error!("Failed to create session: {}", e);
        return fail("session_error");
    }

    info!(discord_id = %user.discord_id, "Login succeeded");
    let policy = &state.config.return_policy;
    let target = policy
        .allowed(pending.continue_to.as_deref())
        .unwrap_or_else(|| policy.default_continue());
    Redirect::to(&target)
}

/// Exchange the code, fetch the profile and persist the user.
async fn complete_login(
    state: &GatewayState,
    code: &str,
    pending: &OAuthState,
    now: DateTime<Utc>,
) -> Result<UserProfile, &'static str> {
    let token = state
        .provider
        .exchange_code(code, &pending.pkce_verifier)
        .await
        .map_err(|e| {
            error!("Discord OAuth exchange error: {}", e);
            "oauth_error"
        })?;

    let profile = state
        .provider
        .fetch_user(&token.access_token)
        .await
        .map_err(|e| {
            error!("Discord user lookup error: {}", e);
            "oauth_error"
        })?;

    state
        .users
        .upsert_discord_user(&profile, &token, now)
        .await
        .map_err(|e| {
            error!("Failed to store user: {}", e);
            "session_error"
        })
}

fn unauthenticated(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "authenticated": false, "error": reason })),
    )
        .into_response()
}

pub(crate) async fn session_status(
    State(state): State<GatewayState>,
    session: Session,
) -> Result<Response, ApiError> {
    let Some(auth) = current_session(&session, Utc::now()).await? else {
        return Ok(unauthenticated("Not authenticated"));
    };
    let Some(user) = state.users.find_user(&auth.discord_id).await? else {
        return Ok(unauthenticated("Invalid session"));
    };

    Ok(Json(json!({
        "authenticated": true,
        "user": UserInfo::from(&user),
    }))
    .into_response())
}

fn wants_html(headers: &HeaderMap) -> bool {
    header(headers, ACCEPT)
        .map(|v| v.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

async fn logout(
    State(state): State<GatewayState>,
    session: Session,
    Query(params): Query<ContinueParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    session.flush().await?;
    debug!("Session revoked");

    let policy = &state.config.return_policy;
    let target = policy
        .allowed(params.continue_to.as_deref())
        .or_else(|| policy.allowed(header(&headers, REFERER).as_deref()));

    Ok(match target {
        Some(url) => Redirect::to(&url).into_response(),
        None if wants_html(&headers) => Redirect::to(&policy.home()).into_response(),
        None => Json(json!({ "ok": true })).into_response(),
    })
}

async fn logout_redirect(
    State(state): State<GatewayState>,
    session: Session,
    Query(params): Query<ContinueParams>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    session.flush().await?;

    let policy = &state.config.return_policy;
    let target = policy
        .allowed(params.continue_to.as_deref())
        .or_else(|| policy.allowed(header(&headers, REFERER).as_deref()))
        .unwrap_or_else(|| policy.home());
    Ok(Redirect::to(&target))
}
