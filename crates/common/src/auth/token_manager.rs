//! Token manager with lazy refresh
//!
//! Manages the OAuth token lifecycle:
//! - Authorization-code exchange and refresh exchange
//! - Holding exactly one current token
//! - Handing every new token to the caller's persistence hook
//! - Atomic "valid access token or refresh" for the request executor
//!
//! There is no background refresh task. A token is refreshed inline by the
//! first request that finds it expired, under the holder's mutex, so
//! concurrent requests trigger a single exchange and all of them observe
//! the refreshed token.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::client::OAuthClientError;
use super::traits::{OAuthClientTrait, TokenPersistence};
use super::types::Token;

/// Error type for token manager operations
#[derive(Debug, Error)]
pub enum TokenManagerError {
    /// No token is held, so there is nothing to use or refresh from
    #[error("no token available; exchange an authorization code or restore a token first")]
    NoToken,

    /// Authorization-code or refresh exchange failed
    #[error("token exchange failed: {0}")]
    Exchange(#[from] OAuthClientError),

    /// The persistence hook rejected the new token
    #[error("token persistence failed: {0}")]
    Persistence(String),
}

/// Holder of the current token plus the exchanges that replace it
pub struct TokenManager<C: OAuthClientTrait + 'static> {
    oauth_client: Arc<C>,
    persistence: Option<Arc<dyn TokenPersistence>>,
    current_token: Mutex<Option<Token>>,
}

impl<C: OAuthClientTrait + 'static> TokenManager<C> {
    /// Create a token manager without a persistence hook
    #[must_use]
    pub fn new(oauth_client: C) -> Self {
        Self { oauth_client: Arc::new(oauth_client), persistence: None, current_token: Mutex::new(None) }
    }

    /// Register the hook called with every newly obtained token
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn TokenPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// The OAuth client used for exchanges
    #[must_use]
    pub fn oauth_client(&self) -> &C {
        &self.oauth_client
    }

    /// Build the browser authorization link
    #[must_use]
    pub fn authorization_link(&self, state: Option<&str>) -> String {
        self.oauth_client.authorization_link(state)
    }

    /// Exchange an authorization code and install the resulting token
    ///
    /// # Errors
    /// Returns error if the exchange fails or the persistence hook fails
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<Token, TokenManagerError> {
        let mut current = self.current_token.lock().await;

        let response = self.oauth_client.exchange_code(code).await?;
        let token = Token::from_response(response, Utc::now())?;

        info!(expires_at = %token.expires_at(), "authorization code exchanged");
        self.install(&mut current, token).await
    }

    /// Refresh the held token unconditionally
    ///
    /// # Errors
    /// Returns [`TokenManagerError::NoToken`] when no token is held, or an
    /// exchange/persistence error
    pub async fn refresh(&self) -> Result<Token, TokenManagerError> {
        let mut current = self.current_token.lock().await;
        self.refresh_locked(&mut current).await
    }

    /// Get a non-expired access token, refreshing first when needed
    ///
    /// This is the primary method for the request executor. The check and
    /// the refresh happen under one lock: callers queued behind a refresh
    /// see the new token instead of exchanging again.
    ///
    /// # Errors
    /// Returns [`TokenManagerError::NoToken`] when no token is held, or the
    /// refresh error when the expired token cannot be refreshed
    pub async fn valid_access_token(&self) -> Result<String, TokenManagerError> {
        let mut current = self.current_token.lock().await;

        let expired = match current.as_ref() {
            Some(token) => token.is_expired(),
            None => return Err(TokenManagerError::NoToken),
        };

        if expired {
            debug!("access token expired, refreshing before dispatch");
            let token = self.refresh_locked(&mut current).await?;
            return Ok(token.access_token().to_string());
        }

        current
            .as_ref()
            .map(|token| token.access_token().to_string())
            .ok_or(TokenManagerError::NoToken)
    }

    /// Install a previously persisted token without calling the hook
    pub async fn set_token(&self, token: Token) {
        *self.current_token.lock().await = Some(token);
        debug!("token restored");
    }

    /// Current token, if any (no refresh)
    pub async fn current_token(&self) -> Option<Token> {
        self.current_token.lock().await.clone()
    }

    /// Drop the held token (logout)
    pub async fn clear_token(&self) {
        *self.current_token.lock().await = None;
        info!("token cleared");
    }

    /// Check if a token is held
    pub async fn is_authenticated(&self) -> bool {
        self.current_token.lock().await.is_some()
    }

    /// Seconds until the held token expires, or None if not authenticated
    pub async fn seconds_until_expiry(&self) -> Option<i64> {
        self.current_token.lock().await.as_ref().map(Token::seconds_until_expiry)
    }

    async fn refresh_locked(
        &self,
        current: &mut MutexGuard<'_, Option<Token>>,
    ) -> Result<Token, TokenManagerError> {
        let refresh_token = match current.as_ref() {
            Some(token) => token.refresh_token().to_string(),
            None => return Err(TokenManagerError::NoToken),
        };

        let response = self.oauth_client.refresh_access_token(&refresh_token).await.map_err(|e| {
            warn!(error = %e, "token refresh failed");
            e
        })?;
        let token = Token::from_response(response, Utc::now())?;

        info!(expires_at = %token.expires_at(), "access token refreshed");
        self.install(current, token).await
    }

    /// Replace the held token, then hand it to the persistence hook
    async fn install(
        &self,
        current: &mut MutexGuard<'_, Option<Token>>,
        token: Token,
    ) -> Result<Token, TokenManagerError> {
        **current = Some(token.clone());

        match &self.persistence {
            Some(persistence) => {
                persistence.token_updated(&token).await.map_err(TokenManagerError::Persistence)?;
            }
            None => debug!("no persistence hook registered; token kept in memory only"),
        }

        Ok(token)
    }
}
