//! Integration tests for auth module
//!
//! Tests the authorization-code flow end to end against a mock token
//! endpoint: code exchange, lazy refresh and token persistence.

#![cfg(feature = "test-utils")]

use std::sync::Arc;

use chrono::{Duration, Utc};
use multivers_common::auth::{
    FnPersistence, OAuthClient, OAuthClientError, OAuthConfig, Token, TokenManager,
    TokenManagerError,
};
use multivers_common::testing::{MockOAuthClient, RecordingPersistence};
use multivers_common::FixedBaseUri;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> OAuthConfig {
    OAuthConfig::new(
        "integration-client",
        "integration-secret",
        "https://app.test/callback",
        FixedBaseUri::new(server.uri()),
    )
}

fn token_body(access: &str, refresh: &str, expires_in: i64) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": expires_in,
        "token_type": "bearer"
    })
}

/// Validates the full code-exchange then refresh sequence against a mock
/// token endpoint.
///
/// # Test Steps
/// 1. Exchange an authorization code; the token is installed and persisted
/// 2. Force a refresh; the held refresh token is sent and the new pair
///    replaces the old one
/// 3. Persistence saw both tokens in order
#[tokio::test(flavor = "multi_thread")]
async fn test_exchange_then_refresh_against_token_endpoint() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/OAuth/Token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a1", "r1", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/OAuth/Token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", "r2", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let persistence = Arc::new(RecordingPersistence::new());
    let manager = TokenManager::new(OAuthClient::new(config_for(&server)))
        .with_persistence(persistence.clone());

    let first = manager.exchange_authorization_code("the-code").await?;
    assert_eq!(first.access_token(), "a1");
    assert_eq!(manager.valid_access_token().await?, "a1");

    let second = manager.refresh().await?;
    assert_eq!(second.access_token(), "a2");
    assert_eq!(second.refresh_token(), "r2");
    assert_eq!(manager.valid_access_token().await?, "a2");

    let persisted = persistence.tokens();
    assert_eq!(persisted, vec![first, second]);
    Ok(())
}

/// A token persisted by one manager and restored into another behaves
/// identically and is used without any exchange.
#[tokio::test(flavor = "multi_thread")]
async fn test_persisted_token_restores_without_exchange() -> anyhow::Result<()> {
    let stored: Arc<std::sync::Mutex<Option<String>>> = Arc::default();
    let sink = stored.clone();

    let first = TokenManager::new(MockOAuthClient::new()).with_persistence(Arc::new(
        FnPersistence::new(move |token: &Token| {
            let json = serde_json::to_string(token).map_err(|e| e.to_string())?;
            *sink.lock().map_err(|e| e.to_string())? = Some(json);
            Ok(())
        }),
    ));
    let original = first.exchange_authorization_code("code").await?;

    let json = stored.lock().unwrap().clone().unwrap();
    let restored: Token = serde_json::from_str(&json)?;
    assert_eq!(restored, original);

    let client = MockOAuthClient::new();
    let second = TokenManager::new(client.clone());
    second.set_token(restored).await;

    assert_eq!(second.valid_access_token().await?, "mock_access_token");
    assert_eq!(client.exchange_count(), 0);
    assert_eq!(client.refresh_count(), 0);
    Ok(())
}

/// An expired restored token is refreshed by the first caller that needs
/// it, and a rejected refresh leaves the caller with the exchange error.
#[tokio::test(flavor = "multi_thread")]
async fn test_expired_token_refresh_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/OAuth/Token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::new(OAuthClient::new(config_for(&server)));
    manager.set_token(Token::new("old", "revoked", Utc::now() - Duration::minutes(1))).await;

    let result = manager.valid_access_token().await;

    assert!(matches!(result, Err(TokenManagerError::Exchange(_))));
}

/// A token response whose lifetime overflows the calendar is an exchange
/// error, and the previously held token stays in place.
#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_range_expires_in_is_exchange_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/OAuth/Token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("a", "r", i64::MAX)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let manager = TokenManager::new(OAuthClient::new(config_for(&server)));

    let result = manager.exchange_authorization_code("c").await;
    assert!(matches!(
        result,
        Err(TokenManagerError::Exchange(OAuthClientError::InvalidExpiry(i64::MAX)))
    ));
    assert!(!manager.is_authenticated().await);

    let held = Token::new("old", "r0", Utc::now() - Duration::minutes(1));
    manager.set_token(held.clone()).await;
    let result = manager.valid_access_token().await;
    assert!(matches!(result, Err(TokenManagerError::Exchange(OAuthClientError::InvalidExpiry(_)))));
    assert_eq!(manager.current_token().await, Some(held));
    Ok(())
}

/// Many tasks hitting an expired token trigger exactly one refresh on the
/// wire.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_token_access_single_refresh() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/OAuth/Token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("fresh", "fresh-refresh", 3600))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = Arc::new(TokenManager::new(OAuthClient::new(config_for(&server))));
    manager.set_token(Token::new("stale", "r0", Utc::now() - Duration::seconds(1))).await;

    let results = futures::future::join_all((0..10).map(|_| {
        let manager = manager.clone();
        async move { manager.valid_access_token().await }
    }))
    .await;

    for result in results {
        assert_eq!(result?, "fresh");
    }
    Ok(())
}

#[tokio::test]
async fn test_authorization_link_targets_token_host() {
    let server = MockServer::start().await;
    let manager = TokenManager::new(OAuthClient::new(config_for(&server)));

    let link = manager.authorization_link(None);

    assert!(link.starts_with(&format!("{}/OAuth/Authorize?", server.uri())));
    assert!(!link.contains("state="));
}
