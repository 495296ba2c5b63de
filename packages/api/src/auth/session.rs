//! Session data types and the cookie layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Session, SessionManagerLayer, SessionStore};

use crate::config::CookieConfig;
use crate::error::ApiError;

/// Key for storing the authenticated identity in the session.
pub const SESSION_AUTH_KEY: &str = "auth";

/// Session data written by the gateway after a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub discord_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn issue(discord_id: impl Into<String>, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            discord_id: discord_id.into(),
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Build the signed session cookie layer shared by both services.
pub fn session_layer<S>(store: S, cookie: &CookieConfig) -> SessionManagerLayer<S, SignedCookie>
where
    S: SessionStore + Clone,
{
    let layer = SessionManagerLayer::new(store)
        .with_name(cookie.name.clone())
        .with_path("/")
        .with_secure(cookie.secure)
        .with_http_only(true)
        .with_same_site(cookie.same_site)
        .with_expiry(cookie.expiry());

    let layer = match &cookie.domain {
        Some(domain) => layer.with_domain(domain.clone()),
        None => layer,
    };

    layer.with_signed(cookie.key.clone())
}

/// The caller's identity, if the session holds one that has not expired.
///
/// Expired entries are reported as absent and left in place.
pub async fn current_session(
    session: &Session,
    now: DateTime<Utc>,
) -> Result<Option<AuthSession>, ApiError> {
    let auth: Option<AuthSession> = session.get(SESSION_AUTH_KEY).await?;
    Ok(auth.filter(|auth| !auth.is_expired_at(now)))
}

/// Replace whatever the session held with a fresh login under a new session id.
pub async fn establish_session(
    session: &Session,
    discord_id: &str,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> Result<AuthSession, ApiError> {
    session.cycle_id().await?;
    let auth = AuthSession::issue(discord_id, now, ttl);
    session.insert(SESSION_AUTH_KEY, &auth).await?;
    Ok(auth)
}
