//! Mock implementations of the auth seams
//!
//! Provides an OAuth client that never touches the network and a
//! persistence hook that records what it was given.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::auth::{OAuthClientError, OAuthClientTrait, Token, TokenPersistence, TokenResponse};

/// Mock OAuth client that simulates the token endpoint without network calls.
#[derive(Clone, Debug, Default)]
pub struct MockOAuthClient {
    exchange_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
    should_fail: Arc<AtomicBool>,
    last_refresh_token: Arc<Mutex<Option<String>>>,
    refresh_response: Arc<Mutex<Option<TokenResponse>>>,
    refresh_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockOAuthClient {
    /// Create a new mock OAuth client with default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the response returned by `refresh_access_token`.
    pub fn set_refresh_response(&self, response: TokenResponse) {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        *self.refresh_response.lock().unwrap() = Some(response);
    }

    /// Force both exchanges to fail.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Make each refresh take `delay` before answering.
    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = Some(delay);
    }

    /// Number of authorization-code exchanges performed.
    #[must_use]
    pub fn exchange_count(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Number of refresh exchanges performed.
    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Refresh token passed to the most recent refresh.
    #[must_use]
    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token.lock().unwrap().clone()
    }

    fn rejection() -> OAuthClientError {
        OAuthClientError::Rejected {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        }
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    fn authorization_link(&self, state: Option<&str>) -> String {
        let mut url = "https://mock.multivers.test/OAuth/Authorize?client_id=test".to_string();
        if let Some(state) = state {
            url.push_str("&state=");
            url.push_str(state);
        }
        url
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenResponse, OAuthClientError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Self::rejection());
        }

        Ok(TokenResponse {
            access_token: "mock_access_token".to_string(),
            refresh_token: "mock_refresh_token".to_string(),
            expires_in: 3600,
        })
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, OAuthClientError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock().unwrap() = Some(refresh_token.to_string());

        let delay = *self.refresh_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Self::rejection());
        }

        let configured = self.refresh_response.lock().unwrap().clone();
        Ok(configured.unwrap_or_else(|| TokenResponse {
            access_token: "refreshed_access_token".to_string(),
            refresh_token: "refreshed_refresh_token".to_string(),
            expires_in: 3600,
        }))
    }
}

/// Persistence hook that keeps every token it receives in memory.
#[derive(Debug, Default)]
pub struct RecordingPersistence {
    tokens: Mutex<Vec<Token>>,
    failure: Option<String>,
}

impl RecordingPersistence {
    /// Create a hook that accepts every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hook that rejects every token with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { tokens: Mutex::new(Vec::new()), failure: Some(message.into()) }
    }

    /// Tokens received so far, oldest first.
    #[must_use]
    pub fn tokens(&self) -> Vec<Token> {
        self.tokens.lock().unwrap().clone()
    }

    /// Most recently received token.
    #[must_use]
    pub fn last(&self) -> Option<Token> {
        self.tokens.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TokenPersistence for RecordingPersistence {
    async fn token_updated(&self, token: &Token) -> Result<(), String> {
        if let Some(message) = &self.failure {
            return Err(message.clone());
        }
        self.tokens.lock().unwrap().push(token.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for testing::mocks.
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn test_mock_oauth_client_counts_calls() {
        let client = MockOAuthClient::new();

        client.exchange_code("c").await.unwrap();
        client.refresh_access_token("r1").await.unwrap();
        client.refresh_access_token("r2").await.unwrap();

        assert_eq!(client.exchange_count(), 1);
        assert_eq!(client.refresh_count(), 2);
        assert_eq!(client.last_refresh_token().as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_mock_oauth_client_failure() {
        let client = MockOAuthClient::new();
        client.set_should_fail(true);

        assert!(client.exchange_code("c").await.is_err());
        assert!(client.refresh_access_token("r").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_oauth_client_configured_refresh() {
        let client = MockOAuthClient::new();
        client.set_refresh_response(TokenResponse {
            access_token: "custom".to_string(),
            refresh_token: "custom-refresh".to_string(),
            expires_in: 60,
        });

        let response = client.refresh_access_token("r").await.unwrap();
        assert_eq!(response.access_token, "custom");
        assert_eq!(response.expires_in, 60);
    }

    #[tokio::test]
    async fn test_recording_persistence() {
        let persistence = RecordingPersistence::new();
        let token = Token::new("a", "r", Utc::now());

        persistence.token_updated(&token).await.unwrap();

        assert_eq!(persistence.tokens(), vec![token.clone()]);
        assert_eq!(persistence.last(), Some(token));
    }

    #[tokio::test]
    async fn test_failing_persistence() {
        let persistence = RecordingPersistence::failing("no space");
        let token = Token::new("a", "r", Utc::now());

        let result = persistence.token_updated(&token).await;

        assert_eq!(result, Err("no space".to_string()));
        assert!(persistence.tokens().is_empty());
    }
}
