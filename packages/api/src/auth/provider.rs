//! The seam between the gateway's routes and the OAuth provider.

use async_trait::async_trait;
use store::{DiscordProfile, ProviderToken};
use thiserror::Error;

/// A prepared authorization redirect.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    /// CSRF state embedded in `url`.
    pub state: String,
    pub pkce_verifier: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("user info request failed: {0}")]
    UserInfo(String),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// An OAuth2 authorization-code provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build an authorization URL with a fresh state and PKCE challenge.
    fn authorization_request(&self) -> AuthorizationRequest;

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<ProviderToken, AuthError>;

    async fn fetch_user(&self, access_token: &str) -> Result<DiscordProfile, AuthError>;
}
