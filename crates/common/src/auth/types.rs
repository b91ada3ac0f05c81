//! OAuth 2.0 types and structures
//!
//! Defines the token value object, the token endpoint response and the
//! client configuration shared by the OAuth client and the request executor.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::client::OAuthClientError;
use crate::endpoint::{
    ApiTarget, BaseUriResolver, Deployment, AUTHORIZE_PATH, OAUTH_SCOPE, TOKEN_PATH,
};

/// Access and refresh token with an absolute expiry
///
/// A `Token` is never mutated once built. Refreshing produces a new value
/// which replaces the previous one in the [`TokenManager`] holder.
///
/// Serializes as `{access_token, refresh_token, expires_at}` so callers can
/// persist it and rebuild it on the next start.
///
/// [`TokenManager`]: super::TokenManager
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Rebuild a token from persisted fields
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into(), expires_at }
    }

    /// Build a token from a token endpoint response received at `now`
    ///
    /// `expires_at` is `now + expires_in` seconds.
    ///
    /// # Errors
    /// Returns [`OAuthClientError::InvalidExpiry`] when the lifetime does not
    /// fit the calendar range
    pub fn from_response(
        response: TokenResponse,
        now: DateTime<Utc>,
    ) -> Result<Self, OAuthClientError> {
        let expires_at = TimeDelta::try_seconds(response.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(OAuthClientError::InvalidExpiry(response.expires_in))?;

        Ok(Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
        })
    }

    /// Bearer credential
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Credential for the `refresh_token` grant
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Instant from which the access token is no longer valid
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `true` iff `now >= expires_at`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// [`is_expired_at`](Self::is_expired_at) against the current time
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Seconds until expiry, negative once expired
    #[must_use]
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response body
///
/// Both grant types answer with the same shape. Extra fields such as
/// `token_type` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// OAuth client credentials plus the endpoint they are used against
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret, sent on both token exchanges
    pub client_secret: String,

    /// Redirect URI registered with the provider
    pub redirect_uri: String,

    /// Sandbox flag and API version
    pub deployment: Deployment,

    /// Platform-specific base-URI strategy
    pub target: Arc<dyn BaseUriResolver>,
}

impl OAuthConfig {
    /// Create a configuration for `target`, production environment, using
    /// the target's default API version
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        target: impl BaseUriResolver + 'static,
    ) -> Self {
        let deployment = Deployment { sandbox: false, version: target.default_version() };
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            deployment,
            target: Arc::new(target),
        }
    }

    /// Shorthand for [`ApiTarget::MULTIVERS`]
    #[must_use]
    pub fn multivers(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self::new(client_id, client_secret, redirect_uri, ApiTarget::MULTIVERS)
    }

    /// Shorthand for [`ApiTarget::BOEKHOUDGEMAK`]
    #[must_use]
    pub fn boekhoudgemak(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self::new(client_id, client_secret, redirect_uri, ApiTarget::BOEKHOUDGEMAK)
    }

    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.deployment.version = version;
        self
    }

    #[must_use]
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.deployment.sandbox = sandbox;
        self
    }

    /// Prefix every request path is appended to
    #[must_use]
    pub fn base_uri(&self) -> String {
        self.target.base_uri(self.deployment)
    }

    #[must_use]
    pub fn authorization_url(&self) -> String {
        format!("{}{AUTHORIZE_PATH}", self.base_uri())
    }

    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.base_uri())
    }

    /// Scope requested during authorization
    #[must_use]
    pub fn scope(&self) -> &'static str {
        OAUTH_SCOPE
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri)
            .field("deployment", &self.deployment)
            .field("target", &self.target)
            .finish()
    }
}
