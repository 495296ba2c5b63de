//! Fixtures for router and config tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::Response;
use axum::Router;
use http_body_util::BodyExt;
use reqwest::Url;
use serde_json::Value;
use store::{DiscordProfile, MemoryStore, ProviderToken};
use tower_sessions::session::Id;

use crate::auth::{
    gateway_router, AuthConfig, AuthError, AuthorizationRequest, GatewayState, IdentityProvider,
};
use crate::config::{AppConfig, Settings};
use crate::notes::{notes_router, NotesState};

/// 64 bytes, hex encoded.
pub const TEST_SECRET: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f";

/// The only code [`FakeProvider`] accepts.
pub const GOOD_CODE: &str = "good-code";

pub fn settings() -> Settings {
    let builder = Settings::defaults()
        .and_then(|b| {
            Ok(b.set_override("mongodb_uri", "bW9uZ29kYjovL2xvY2FsaG9zdDoyNzAxNw==")?
                .set_override("auth_session_secret", TEST_SECRET)?
                .set_override("discord_client_id", "test-client")?
                .set_override("discord_client_secret", "test-secret")?)
        })
        .unwrap();
    Settings::build(builder).unwrap()
}

pub fn app_config() -> AppConfig {
    AppConfig::from_settings(&settings()).unwrap()
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::from_settings(&settings()).unwrap()
}

/// Discord stand-in: hands out random states and knows one user.
pub struct FakeProvider {
    pub profile: DiscordProfile,
    issued: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            profile: DiscordProfile {
                id: "80351110224678912".to_string(),
                username: "nelly".to_string(),
                global_name: Some("Nelly".to_string()),
                avatar: Some("8342729096ea3675442027381ff50dfe".to_string()),
                discriminator: Some("0".to_string()),
            },
            issued: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_request(&self) -> AuthorizationRequest {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let state = oauth2::CsrfToken::new_random().secret().clone();
        AuthorizationRequest {
            url: format!("https://discord.test/oauth2/authorize?state={state}"),
            state,
            pkce_verifier: format!("verifier-{n}"),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<ProviderToken, AuthError> {
        if code != GOOD_CODE || !pkce_verifier.starts_with("verifier-") {
            return Err(AuthError::TokenExchange("invalid_grant".to_string()));
        }
        Ok(ProviderToken {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: Some(604_800),
            scope: Some("identify".to_string()),
            token_type: "Bearer".to_string(),
        })
    }

    async fn fetch_user(&self, access_token: &str) -> Result<DiscordProfile, AuthError> {
        if access_token != "access" {
            return Err(AuthError::UserInfo("401 Unauthorized".to_string()));
        }
        Ok(self.profile.clone())
    }
}

/// Gateway and notes routers sharing one store and one session store.
pub struct TestApp {
    pub store: MemoryStore,
    pub sessions: tower_sessions::MemoryStore,
    pub gateway: Router,
    pub notes: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let sessions = tower_sessions::MemoryStore::default();
        let config = Arc::new(app_config());

        let gateway = gateway_router(
            GatewayState {
                config: config.clone(),
                auth: Arc::new(auth_config()),
                users: Arc::new(store.clone()),
                states: Arc::new(store.clone()),
                provider: Arc::new(FakeProvider::new()),
            },
            sessions.clone(),
        );
        let notes = notes_router(
            NotesState {
                config,
                documents: Arc::new(store.clone()),
            },
            sessions.clone(),
        );

        Self {
            store,
            sessions,
            gateway,
            notes,
        }
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(LOCATION)
        .expect("no Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// The `name=value` part of the first `Set-Cookie` header.
pub fn cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Session id carried by a signed `name=value` cookie.
///
/// Signed values are the HMAC digest followed by the 22 character id.
pub fn session_id(cookie: &str) -> Id {
    const ID_LEN: usize = 22;
    let (_, value) = cookie.split_once('=').expect("not a name=value cookie");
    value[value.len() - ID_LEN..].parse().expect("not a session id")
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
