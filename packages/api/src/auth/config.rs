//! OAuth configuration for the Discord provider and the gateway's redirect policy.

use std::time::Duration;

use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use reqwest::Url;

use super::redirect::ReturnPolicy;
use crate::config::{positive, ConfigError, Settings};

pub const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
pub const DISCORD_API: &str = "https://discord.com/api";

/// OAuth provider configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub redirect_url: RedirectUrl,
    pub user_info_url: String,
    pub scopes: Vec<String>,
    /// Applies to the token exchange and the user info call.
    pub timeout: Duration,
}

impl OAuthConfig {
    /// Create Discord OAuth config from settings.
    pub fn discord(settings: &Settings) -> Result<Self, ConfigError> {
        let client_id = required(&settings.discord_client_id, "DISCORD_CLIENT_ID")?;
        let client_secret = required(&settings.discord_client_secret, "DISCORD_CLIENT_SECRET")?;

        let scopes: Vec<String> = settings
            .discord_scope
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if scopes.is_empty() {
            return Err(ConfigError::Missing("DISCORD_SCOPE"));
        }

        Ok(Self {
            client_id: ClientId::new(client_id),
            client_secret: ClientSecret::new(client_secret),
            auth_url: AuthUrl::new(DISCORD_AUTHORIZE_URL.to_string()).map_err(|e| {
                ConfigError::Invalid {
                    var: "DISCORD_AUTHORIZE_URL",
                    reason: e.to_string(),
                }
            })?,
            token_url: TokenUrl::new(format!("{DISCORD_API}/oauth2/token")).map_err(|e| {
                ConfigError::Invalid {
                    var: "DISCORD_TOKEN_URL",
                    reason: e.to_string(),
                }
            })?,
            redirect_url: RedirectUrl::new(settings.discord_redirect_uri.clone()).map_err(
                |e| ConfigError::Invalid {
                    var: "DISCORD_REDIRECT_URI",
                    reason: e.to_string(),
                },
            )?,
            user_info_url: format!("{DISCORD_API}/users/@me"),
            scopes,
            timeout: Duration::from_secs(
                positive(settings.discord_timeout_secs, "DISCORD_TIMEOUT_SECS")?.unsigned_abs(),
            ),
        })
    }
}

/// Everything the gateway needs beyond [`AppConfig`](crate::config::AppConfig).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub oauth: OAuthConfig,
    /// Where failed logins land; an `error` query parameter is appended.
    pub failure_redirect: Url,
    pub state_ttl: chrono::Duration,
}

impl AuthConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let return_policy = ReturnPolicy::new(&settings.auth_allowed_return_hosts)?;

        let failure_redirect = match settings.auth_failure_redirect.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("https://{}/login", return_policy.primary_host()),
        };
        let failure_redirect = Url::parse(&failure_redirect).map_err(|e| ConfigError::Invalid {
            var: "AUTH_FAILURE_REDIRECT",
            reason: e.to_string(),
        })?;

        Ok(Self {
            oauth: OAuthConfig::discord(settings)?,
            failure_redirect,
            state_ttl: chrono::Duration::minutes(positive(
                settings.auth_state_ttl_minutes,
                "AUTH_STATE_TTL_MINUTES",
            )?),
        })
    }

    /// Failure destination tagged with a short reason code.
    pub fn failure_url(&self, reason: &str) -> String {
        let mut url = self.failure_redirect.clone();
        url.query_pairs_mut().append_pair("error", reason);
        url.to_string()
    }
}

fn required(value: &Option<String>, var: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(var))
}
