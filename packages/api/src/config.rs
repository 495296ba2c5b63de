//! # Configuration — read once at startup, immutable afterwards
//!
//! [`Settings`] is the raw, flat view of the environment: `dotenvy` loads a `.env`
//! file if present, then the `config` crate layers an optional `config.toml` under
//! the process environment. Keys are the lower-cased variable names
//! (`AUTH_COOKIE_NAME` → `auth_cookie_name`).
//!
//! [`AppConfig`] is the validated form both services share: decoded database URI,
//! cookie policy and signing key, listen ports, trusted return hosts. The gateway additionally builds an
//! [`AuthConfig`](crate::auth::AuthConfig) from the same [`Settings`]. Every failure
//! here is a [`ConfigError`] and the binaries treat it as fatal.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::Expiry;

use crate::auth::ReturnPolicy;

/// Length of the cookie signing key, in bytes.
pub const SESSION_KEY_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Raw settings as read from the environment.
#[derive(Clone, Deserialize)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub mongodb_app_name: String,
    pub auth_session_secret: String,
    pub auth_cookie_name: String,
    pub auth_cookie_domain: String,
    pub auth_cookie_secure: bool,
    pub auth_cookie_samesite: String,
    pub auth_session_ttl_days: i64,
    pub auth_state_ttl_minutes: i64,
    pub auth_allowed_return_hosts: String,
    pub auth_failure_redirect: Option<String>,
    pub discord_client_id: Option<String>,
    pub discord_client_secret: Option<String>,
    pub discord_redirect_uri: String,
    pub discord_scope: String,
    pub discord_timeout_secs: i64,
    pub notes_server_port: u16,
    pub auth_server_port: u16,
}

impl Settings {
    /// Load `.env`, `config.toml` (optional) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::build(
            Self::defaults()?
                .add_source(
                    File::with_name("config.toml")
                        .format(FileFormat::Toml)
                        .required(false),
                )
                .add_source(Environment::default()),
        )
    }

    pub(crate) fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("mongodb_database", "botdb")?
            .set_default("mongodb_app_name", "ledd")?
            .set_default("auth_cookie_name", "ledd_auth")?
            .set_default("auth_cookie_domain", ".ledd.live")?
            .set_default("auth_cookie_secure", true)?
            .set_default("auth_cookie_samesite", "Lax")?
            .set_default("auth_session_ttl_days", 30_i64)?
            .set_default("auth_state_ttl_minutes", 10_i64)?
            .set_default("auth_allowed_return_hosts", "ledd.live")?
            .set_default("discord_redirect_uri", "http://localhost:3100/callback")?
            .set_default("discord_scope", "identify")?
            .set_default("discord_timeout_secs", 10_i64)?
            .set_default("notes_server_port", 3000_i64)?
            .set_default("auth_server_port", 3100_i64)?)
    }

    pub(crate) fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize()?)
    }
}

/// Connection settings for MongoDB.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Decoded connection string.
    pub uri: String,
    pub name: String,
    pub app_name: String,
}

/// Session cookie policy and signing key.
#[derive(Clone)]
pub struct CookieConfig {
    pub name: String,
    /// `None` for a host-only cookie.
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: SameSite,
    pub ttl_days: i64,
    pub key: Key,
}

impl CookieConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.ttl_days)
    }

    pub fn expiry(&self) -> Expiry {
        Expiry::OnInactivity(time::Duration::days(self.ttl_days))
    }
}

/// Listen ports for the two binaries.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub notes_port: u16,
    pub auth_port: u16,
}

/// Validated configuration shared by both services.
#[derive(Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub cookie: CookieConfig,
    pub server: ServerConfig,
    /// Hosts trusted for post-login redirects and cross-origin requests.
    pub return_policy: ReturnPolicy,
}

impl AppConfig {
    /// Read the environment and validate it.
    pub fn load() -> Result<(Self, Settings), ConfigError> {
        let settings = Settings::load()?;
        let config = Self::from_settings(&settings)?;
        Ok((config, settings))
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            database: DatabaseConfig {
                uri: decode_mongodb_uri(&settings.mongodb_uri)?,
                name: settings.mongodb_database.clone(),
                app_name: settings.mongodb_app_name.clone(),
            },
            cookie: CookieConfig {
                name: settings.auth_cookie_name.clone(),
                domain: Some(settings.auth_cookie_domain.trim().to_string())
                    .filter(|d| !d.is_empty()),
                secure: settings.auth_cookie_secure,
                same_site: parse_same_site(&settings.auth_cookie_samesite)?,
                ttl_days: positive(settings.auth_session_ttl_days, "AUTH_SESSION_TTL_DAYS")?,
                key: parse_session_key(&settings.auth_session_secret)?,
            },
            server: ServerConfig {
                notes_port: settings.notes_server_port,
                auth_port: settings.auth_server_port,
            },
            return_policy: ReturnPolicy::new(&settings.auth_allowed_return_hosts)?,
        })
    }
}

/// `MONGODB_URI` is stored base64 encoded.
pub fn decode_mongodb_uri(encoded: &str) -> Result<String, ConfigError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(ConfigError::Missing("MONGODB_URI"));
    }
    let bytes = STANDARD.decode(encoded).map_err(|e| ConfigError::Invalid {
        var: "MONGODB_URI",
        reason: format!("not valid base64: {e}"),
    })?;
    String::from_utf8(bytes).map_err(|_| ConfigError::Invalid {
        var: "MONGODB_URI",
        reason: "decoded value is not UTF-8".to_string(),
    })
}

pub fn parse_same_site(value: &str) -> Result<SameSite, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" => Ok(SameSite::None),
        other => Err(ConfigError::Invalid {
            var: "AUTH_COOKIE_SAMESITE",
            reason: format!("expected Lax, Strict or None, got {other:?}"),
        }),
    }
}

/// Hex encoded 64-byte key used to sign session cookies.
pub fn parse_session_key(hex_key: &str) -> Result<Key, ConfigError> {
    let hex_key = hex_key.trim();
    if hex_key.is_empty() {
        return Err(ConfigError::Missing("AUTH_SESSION_SECRET"));
    }
    let bytes = hex::decode(hex_key).map_err(|e| ConfigError::Invalid {
        var: "AUTH_SESSION_SECRET",
        reason: format!("invalid hex: {e}"),
    })?;
    if bytes.len() != SESSION_KEY_LEN {
        return Err(ConfigError::Invalid {
            var: "AUTH_SESSION_SECRET",
            reason: format!(
                "must be {} hex chars ({SESSION_KEY_LEN} bytes), got {} bytes",
                SESSION_KEY_LEN * 2,
                bytes.len()
            ),
        });
    }
    Ok(Key::from(bytes.as_slice()))
}

pub(crate) fn positive(value: i64, var: &'static str) -> Result<i64, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            var,
            reason: format!("must be greater than zero, got {value}"),
        })
    }
}
