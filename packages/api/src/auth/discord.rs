//! # Discord OAuth 2.0 implementation
//!
//! Authorization Code flow with PKCE against Discord's endpoints.
//!
//! ## Types
//!
//! - [`ConfiguredClient`] — a fully-typed `oauth2::Client` alias with auth and token
//!   endpoints set.
//! - [`DiscordOAuth`] — the [`IdentityProvider`] the gateway runs with in production.
//!
//! ## Flow
//!
//! 1. **[`authorization_request`](IdentityProvider::authorization_request)** — builds an
//!    authorization URL for the configured scopes with a random CSRF state and PKCE
//!    challenge. Persisting the state is the caller's job.
//! 2. **[`exchange_code`](IdentityProvider::exchange_code)** — swaps the code and PKCE
//!    verifier for tokens. Client credentials travel in the request body.
//! 3. **[`fetch_user`](IdentityProvider::fetch_user)** — `GET /users/@me` with the
//!    access token.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthorizationCode, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge,
    PkceCodeVerifier, Scope, TokenResponse,
};
use reqwest::Client;
use store::{DiscordProfile, ProviderToken};

use super::config::OAuthConfig;
use super::provider::{AuthError, AuthorizationRequest, IdentityProvider};

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Discord OAuth handler.
pub struct DiscordOAuth {
    config: OAuthConfig,
    client: ConfiguredClient,
    http: Client,
}

impl DiscordOAuth {
    pub fn new(config: OAuthConfig) -> Result<Self, AuthError> {
        // Token and user endpoints must never redirect.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout)
            .build()?;

        let client = BasicClient::new(config.client_id.clone())
            .set_client_secret(config.client_secret.clone())
            .set_auth_uri(config.auth_url.clone())
            .set_token_uri(config.token_url.clone())
            .set_redirect_uri(config.redirect_url.clone())
            .set_auth_type(AuthType::RequestBody);

        Ok(Self {
            config,
            client,
            http,
        })
    }
}

#[async_trait]
impl IdentityProvider for DiscordOAuth {
    fn authorization_request(&self) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.config.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();

        AuthorizationRequest {
            url: url.to_string(),
            state: csrf_state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<ProviderToken, AuthError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        Ok(ProviderToken {
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_in: token.expires_in().map(|d| d.as_secs()),
            scope: token.scopes().map(|scopes| {
                scopes
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
            token_type: token.token_type().as_ref().to_string(),
        })
    }

    async fn fetch_user(&self, access_token: &str) -> Result<DiscordProfile, AuthError> {
        let response = self
            .http
            .get(&self.config.user_info_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::UserInfo(format!("{status}: {body}")));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::testing::settings;
    use reqwest::Url;

    fn provider() -> DiscordOAuth {
        let config = AuthConfig::from_settings(&settings()).unwrap();
        DiscordOAuth::new(config.oauth).unwrap()
    }

    #[test]
    fn test_authorization_url_carries_pkce_and_state() {
        let request = provider().authorization_request();
        let url = Url::parse(&request.url).unwrap();

        assert_eq!(url.host_str(), Some("discord.com"));
        assert_eq!(url.path(), "/oauth2/authorize");

        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };
        assert_eq!(param("client_id").as_deref(), Some("test-client"));
        assert_eq!(param("response_type").as_deref(), Some("code"));
        assert_eq!(param("scope").as_deref(), Some("identify"));
        assert_eq!(param("code_challenge_method").as_deref(), Some("S256"));
        assert_eq!(param("state"), Some(request.state.clone()));
        assert!(!request.pkce_verifier.is_empty());
    }

    #[test]
    fn test_states_are_fresh() {
        let provider = provider();
        let a = provider.authorization_request();
        let b = provider.authorization_request();
        assert_ne!(a.state, b.state);
        assert_ne!(a.pkce_verifier, b.pkce_verifier);
    }
}
