//! # API crate — HTTP services for the ledd notes API and Discord auth gateway
//!
//! Both binaries (`packages/notes`, `packages/gateway`) are thin: they load
//! configuration, connect to MongoDB and serve one of the routers built here.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Discord OAuth (PKCE, single-use state), signed session cookies, return-URL policy, gateway routes |
//! | [`config`] | `Settings` from the environment, validated `AppConfig` |
//! | [`db`] | MongoDB client options, connect + ping, index setup |
//! | [`error`] | `ApiError`, the JSON error response |
//! | [`models`] | Client-safe projections (`UserInfo`) |
//! | [`notes`] | Notes/pages CRUD and the per-user note |
//! | [`server`] | Bind, serve, graceful shutdown on Ctrl+C / SIGTERM |
//!
//! ## Routers
//!
//! - [`notes_router`] — the notes service, `NOTES_SERVER_PORT` (3000).
//! - [`gateway_router`] — the auth gateway, `AUTH_SERVER_PORT` (3100).
//!
//! Both take a `tower_sessions::SessionStore`; production passes
//! [`store::MongoSessionStore`], tests pass `tower_sessions::MemoryStore`. The two
//! services share the cookie name and signing key, so a session created by the gateway
//! authenticates `/me/note` on the notes service.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notes;
mod routes;
pub mod server;

#[cfg(test)]
mod testing;

pub use auth::{gateway_router, AuthConfig, DiscordOAuth, GatewayState};
pub use config::{AppConfig, ConfigError, Settings};
pub use error::ApiError;
pub use models::UserInfo;
pub use notes::{notes_router, NotesState};
