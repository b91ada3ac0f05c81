//! Traits for OAuth and token persistence operations
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (the provider's token endpoint, the caller's token
//! storage).

use async_trait::async_trait;

use super::client::OAuthClientError;
use super::types::{Token, TokenResponse};

/// Trait for OAuth client operations
///
/// This trait abstracts the token endpoint so the token manager can be
/// exercised against mock implementations.
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Build the browser-facing authorization link
    ///
    /// Pure function of the configuration; performs no network call.
    fn authorization_link(&self, state: Option<&str>) -> String;

    /// Exchange an authorization code (`grant_type=authorization_code`)
    ///
    /// # Errors
    /// Returns error if the token endpoint rejects the code or answers with
    /// a malformed body
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthClientError>;

    /// Exchange a refresh token (`grant_type=refresh_token`)
    ///
    /// # Errors
    /// Returns error if the refresh token is rejected or the response is
    /// malformed
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, OAuthClientError>;
}

/// Hook invoked with every newly obtained token
///
/// This is the only persistence boundary: the core keeps tokens in memory
/// and the caller decides where they survive a restart (session, database,
/// file). The hook is awaited before the new token is used for any request.
#[async_trait]
pub trait TokenPersistence: Send + Sync {
    /// Store `token`
    ///
    /// # Errors
    /// Returns a description of the storage failure
    async fn token_updated(&self, token: &Token) -> Result<(), String>;
}

/// Adapter turning a plain closure into a [`TokenPersistence`]
///
/// ```
/// use multivers_common::auth::{FnPersistence, Token};
///
/// let hook = FnPersistence::new(|token: &Token| {
///     tracing::info!(expires_at = %token.expires_at(), "token updated");
///     Ok(())
/// });
/// # let _ = hook;
/// ```
pub struct FnPersistence<F>(F);

impl<F> FnPersistence<F>
where
    F: Fn(&Token) -> Result<(), String> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

#[async_trait]
impl<F> TokenPersistence for FnPersistence<F>
where
    F: Fn(&Token) -> Result<(), String> + Send + Sync,
{
    async fn token_updated(&self, token: &Token) -> Result<(), String> {
        (self.0)(token)
    }
}
