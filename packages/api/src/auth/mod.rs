//! Discord OAuth login and session handling for the auth gateway.

mod config;
mod discord;
mod provider;
mod redirect;
mod routes;
mod session;

pub use config::{AuthConfig, OAuthConfig};
pub use discord::DiscordOAuth;
pub use provider::{AuthError, AuthorizationRequest, IdentityProvider};
pub use redirect::ReturnPolicy;
pub use routes::{gateway_router, GatewayState};
pub use session::{
    current_session, establish_session, session_layer, AuthSession, SESSION_AUTH_KEY,
};
