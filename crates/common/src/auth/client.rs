//! OAuth 2.0 authorization-code client
//!
//! Handles the provider side of the flow:
//! - Browser authorization link building
//! - Authorization code exchange
//! - Token refresh
//!
//! Both exchanges are form-encoded POSTs to `{base}/OAuth/Token` carrying the
//! client credentials and the registered redirect URI.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use super::traits::OAuthClientTrait;
use super::types::{OAuthConfig, TokenResponse};
use crate::endpoint::base_headers;

/// Error type for token endpoint operations
#[derive(Debug, Error)]
pub enum OAuthClientError {
    /// Network, TLS or timeout failure while talking to the token endpoint
    #[error("token endpoint request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Token endpoint answered with a non-success status
    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    /// Token endpoint answered 2xx with a body that is not a token response
    #[error("malformed token response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// Token endpoint answered with an `expires_in` no instant can hold
    #[error("token lifetime out of range: {0} seconds")]
    InvalidExpiry(i64),
}

/// Authorization-code client for one provider deployment
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl OAuthClient {
    /// Create a client with its own HTTP connection pool
    ///
    /// Falls back to a default reqwest client if the tuned one cannot be
    /// built.
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(base_headers())
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "falling back to default HTTP client for OAuth");
                Client::new()
            });

        Self { config, client }
    }

    /// Create a client sharing an existing HTTP client (and its TLS and
    /// timeout settings)
    #[must_use]
    pub fn with_http_client(config: OAuthConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Build the provider's authorization URL
    ///
    /// Carries `client_id`, `redirect_uri`, `scope`, `response_type=code`
    /// and, when given, `state`.
    ///
    /// # Examples
    /// ```
    /// use multivers_common::auth::{OAuthClient, OAuthConfig};
    ///
    /// let config = OAuthConfig::multivers("client_id", "secret", "https://app.test/callback");
    /// let client = OAuthClient::new(config);
    /// let url = client.authorization_link(Some("xyz"));
    /// assert!(url.starts_with("https://api.multivers.nl/V21/OAuth/Authorize?"));
    /// ```
    #[must_use]
    pub fn authorization_link(&self, state: Option<&str>) -> String {
        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", self.config.scope()),
            ("response_type", "code"),
        ];

        if let Some(state) = state {
            params.push(("state", state));
        }

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.config.authorization_url(), query_string)
    }

    /// Exchange an authorization code for a token pair
    ///
    /// # Errors
    /// Returns error if the request fails, the endpoint rejects the code, or
    /// the response cannot be parsed
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthClientError> {
        let form = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        self.request_token(&form).await
    }

    /// Exchange a refresh token for a new token pair
    ///
    /// # Errors
    /// Returns error if the request fails, the refresh token is rejected, or
    /// the response cannot be parsed
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, OAuthClientError> {
        let form = [
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "refresh_token"),
        ];

        self.request_token(&form).await
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, OAuthClientError> {
        let url = self.config.token_url();
        let grant_type =
            form.iter().find(|(k, _)| *k == "grant_type").map_or("", |(_, v)| *v);
        debug!(%url, grant_type, "requesting token");

        let response = self.client.post(&url).form(form).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OAuthClientError::Rejected { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Get a reference to the OAuth configuration
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

#[async_trait]
impl OAuthClientTrait for OAuthClient {
    fn authorization_link(&self, state: Option<&str>) -> String {
        self.authorization_link(state)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthClientError> {
        self.exchange_code(code).await
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, OAuthClientError> {
        self.refresh_access_token(refresh_token).await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::client.
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::endpoint::FixedBaseUri;

    fn create_test_config() -> OAuthConfig {
        OAuthConfig::multivers("test_client_id", "test_secret", "https://app.test/callback")
    }

    fn mock_client(server: &MockServer) -> OAuthClient {
        let config = OAuthConfig::new(
            "test_client_id",
            "test_secret",
            "https://app.test/callback",
            FixedBaseUri::new(server.uri()),
        );
        OAuthClient::new(config)
    }

    fn query_keys(url: &str) -> Vec<String> {
        let (_, query) = url.split_once('?').unwrap();
        query.split('&').map(|pair| pair.split('=').next().unwrap().to_string()).collect()
    }

    /// Without state the link carries exactly the four fixed parameters.
    #[test]
    fn test_authorization_link_without_state() {
        let client = OAuthClient::new(create_test_config());

        let url = client.authorization_link(None);

        assert!(url.starts_with("https://api.multivers.nl/V21/OAuth/Authorize?"));
        assert_eq!(query_keys(&url), vec!["client_id", "redirect_uri", "scope", "response_type"]);
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.test%2Fcallback"));
        assert!(url.contains("scope=http%3A%2F%2FUNIT4.Multivers.API%2FWeb%2FWebApi%2F%2A"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn test_authorization_link_with_state() {
        let client = OAuthClient::new(create_test_config());

        let url = client.authorization_link(Some("csrf token"));

        assert_eq!(
            query_keys(&url),
            vec!["client_id", "redirect_uri", "scope", "response_type", "state"]
        );
        assert!(url.ends_with("state=csrf%20token"));
    }

    #[test]
    fn test_authorization_link_is_deterministic() {
        let client = OAuthClient::new(create_test_config());
        assert_eq!(client.authorization_link(Some("s")), client.authorization_link(Some("s")));
    }

    #[test]
    fn test_oauth_client_config_access() {
        let client = OAuthClient::new(create_test_config());

        assert_eq!(client.config().client_id, "test_client_id");
        assert_eq!(client.config().redirect_uri, "https://app.test/callback");
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/OAuth/Token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(header("accept", "application/json"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("client_id=test_client_id"))
            .and(body_string_contains("client_secret=test_secret"))
            .and(body_string_contains("redirect_uri=https%3A%2F%2Fapp.test%2Fcallback"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = mock_client(&server).exchange_code("auth-code").await.unwrap();

        assert_eq!(response.access_token, "new-access");
        assert_eq!(response.refresh_token, "new-refresh");
        assert_eq!(response.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_refresh_posts_refresh_grant() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/OAuth/Token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-access",
                "refresh_token": "fresh-refresh",
                "expires_in": 1800
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = mock_client(&server).refresh_access_token("old-refresh").await.unwrap();

        assert_eq!(response.access_token, "fresh-access");
        assert_eq!(response.expires_in, 1800);
    }

    #[tokio::test]
    async fn test_exchange_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/OAuth/Token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let result = mock_client(&server).exchange_code("bad-code").await;

        match result {
            Err(OAuthClientError::Rejected { status, body }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/OAuth/Token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = mock_client(&server).exchange_code("code").await;
        assert!(matches!(result, Err(OAuthClientError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_exchange_missing_fields() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/OAuth/Token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "a"})))
            .mount(&server)
            .await;

        let result = mock_client(&server).refresh_access_token("r").await;
        assert!(matches!(result, Err(OAuthClientError::InvalidResponse(_))));
    }
}
