//! Request executor for the Multivers and Boekhoudgemak REST APIs
//!
//! Every generic verb goes through [`ApiClient::execute`], which attaches a
//! valid bearer token (refreshing it first when expired), encodes the body,
//! sends the request once and maps the outcome onto [`ApiError`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use multivers_common::auth::{
    FnPersistence, OAuthClient, OAuthClientTrait, OAuthConfig, Token, TokenManager,
    TokenPersistence,
};
use multivers_common::endpoint::is_oauth_path;
use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::errors::{ApiError, DATABASE_REQUIRED};
use crate::http::HttpClient;

/// Empty query string, for calls without query parameters
pub const NO_QUERY: &[(&str, &str)] = &[];

/// Configuration for API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Client credentials and target deployment
    pub oauth: OAuthConfig,
    /// Timeout for a whole request, token exchanges included
    pub timeout: Duration,
    /// Optional `User-Agent` header
    pub user_agent: Option<String>,
    /// Skip TLS certificate verification. Off unless explicitly enabled.
    pub accept_invalid_certs: bool,
    /// Administration database, when known up front
    pub database: Option<String>,
}

impl ApiClientConfig {
    /// Defaults: 30 second timeout, TLS verification on, no database
    pub fn new(oauth: OAuthConfig) -> Self {
        Self {
            oauth,
            timeout: Duration::from_secs(30),
            user_agent: None,
            accept_invalid_certs: false,
            database: None,
        }
    }
}

/// How a POST or PUT body is put on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    /// `application/json`
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`; the body must be a flat object
    Form,
}

/// Request body, already converted from the caller's DTO
#[derive(Debug, Clone)]
pub struct RequestBody {
    value: Value,
    encoding: BodyEncoding,
}

impl RequestBody {
    /// # Errors
    /// Returns [`ApiError::Decode`] if `body` cannot be represented as JSON
    pub fn new<B: Serialize + ?Sized>(body: &B, encoding: BodyEncoding) -> Result<Self, ApiError> {
        Ok(Self { value: serde_json::to_value(body)?, encoding })
    }

    /// # Errors
    /// Returns [`ApiError::Decode`] if `body` cannot be represented as JSON
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        Self::new(body, BodyEncoding::Json)
    }

    /// # Errors
    /// Returns [`ApiError::Decode`] if `body` cannot be represented as JSON
    pub fn form<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        Self::new(body, BodyEncoding::Form)
    }
}

/// Successful response body
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Decoded JSON; an empty body decodes to `Null`
    Json(Value),
    /// Body text as received
    Raw(String),
}

impl ApiResponse {
    fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Raw(text) => Value::String(text),
        }
    }

    fn into_text(self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Raw(text) => text,
        }
    }
}

/// OAuth2-authenticated API client
///
/// Holds exactly one token at a time. Share it behind an `Arc` to issue
/// concurrent calls; an expired token is refreshed once for all of them.
pub struct ApiClient<C: OAuthClientTrait + 'static = OAuthClient> {
    http: HttpClient,
    tokens: TokenManager<C>,
    config: ApiClientConfig,
    database: OnceLock<String>,
}

impl ApiClient<OAuthClient> {
    /// Create a client talking to the provider's token endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or the configured
    /// database is empty
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        Self::builder().config(config).build()
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }
}

impl<C: OAuthClientTrait + 'static> ApiClient<C> {
    /// Create a client that performs token exchanges through `oauth_client`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or the configured
    /// database is empty
    pub fn with_oauth_client(config: ApiClientConfig, oauth_client: C) -> Result<Self, ApiError> {
        let http = build_http_client(&config)?;
        Self::assemble(config, http, TokenManager::new(oauth_client))
    }

    fn assemble(
        config: ApiClientConfig,
        http: HttpClient,
        tokens: TokenManager<C>,
    ) -> Result<Self, ApiError> {
        let client = Self { http, tokens, database: OnceLock::new(), config };
        if let Some(database) = client.config.database.clone() {
            client.set_database(database)?;
        }
        Ok(client)
    }

    /// Register the hook called with every newly obtained token
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn TokenPersistence>) -> Self {
        self.tokens = self.tokens.with_persistence(persistence);
        self
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Prefix every request path is appended to
    pub fn base_uri(&self) -> String {
        self.config.oauth.base_uri()
    }

    pub fn token_manager(&self) -> &TokenManager<C> {
        &self.tokens
    }

    /// Browser authorization link, see
    /// [`TokenManager::authorization_link`]
    pub fn authorization_link(&self, state: Option<&str>) -> String {
        self.tokens.authorization_link(state)
    }

    /// # Errors
    /// Returns [`ApiError::AuthExchange`] or [`ApiError::Persistence`]
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<Token, ApiError> {
        Ok(self.tokens.exchange_authorization_code(code).await?)
    }

    /// # Errors
    /// Returns [`ApiError::NoToken`], [`ApiError::AuthExchange`] or
    /// [`ApiError::Persistence`]
    pub async fn refresh(&self) -> Result<Token, ApiError> {
        Ok(self.tokens.refresh().await?)
    }

    /// Restore a previously persisted token
    pub async fn set_token(&self, token: Token) {
        self.tokens.set_token(token).await;
    }

    pub async fn current_token(&self) -> Option<Token> {
        self.tokens.current_token().await
    }

    pub async fn clear_token(&self) {
        self.tokens.clear_token().await;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated().await
    }

    /// Select the administration database used by [`database_path`]
    ///
    /// Can be set once per client. Setting the same value again is a no-op.
    ///
    /// # Errors
    /// Returns [`ApiError::Database`] for an empty name and
    /// [`ApiError::Config`] when a different database is already set
    ///
    /// [`database_path`]: Self::database_path
    pub fn set_database(&self, database: impl Into<String>) -> Result<(), ApiError> {
        let database = database.into();
        if database.trim().is_empty() {
            return Err(ApiError::Database("database name must not be empty".to_string()));
        }

        match self.database.set(database) {
            Ok(()) => {
                info!(database = %self.database.get().map_or("", String::as_str), "database selected");
                Ok(())
            }
            Err(rejected) if self.database.get() == Some(&rejected) => Ok(()),
            Err(rejected) => Err(ApiError::Config(format!(
                "database already set, cannot switch to '{rejected}'; create a new client instead"
            ))),
        }
    }

    /// # Errors
    /// Returns [`ApiError::Database`] when no database is set
    pub fn database(&self) -> Result<&str, ApiError> {
        self.database
            .get()
            .map(String::as_str)
            .ok_or_else(|| ApiError::Database(DATABASE_REQUIRED.to_string()))
    }

    /// `/api/{database}{suffix}`
    ///
    /// # Errors
    /// Returns [`ApiError::Database`] when no database is set
    pub fn database_path(&self, suffix: &str) -> Result<String, ApiError> {
        Ok(format!("/api/{}{suffix}", self.database()?))
    }

    /// Execute a GET request and decode the JSON response into `T`
    ///
    /// # Errors
    ///
    /// Returns error if no valid token can be obtained, the request fails,
    /// or the response cannot be decoded
    #[instrument(skip_all, fields(path = %path))]
    pub async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let value = self.execute(Method::GET, path, None, query, true).await?.into_json();
        Ok(serde_json::from_value(value)?)
    }

    /// Execute a GET request and return the body text undecoded
    ///
    /// # Errors
    ///
    /// Returns error if no valid token can be obtained or the request fails
    #[instrument(skip_all, fields(path = %path))]
    pub async fn get_raw<Q>(&self, path: &str, query: &Q) -> Result<String, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        Ok(self.execute(Method::GET, path, None, query, false).await?.into_text())
    }

    /// Execute a POST request
    ///
    /// Returns `None` when the response body is empty.
    ///
    /// # Errors
    ///
    /// Returns error if no valid token can be obtained, the request fails,
    /// or the response cannot be decoded
    #[instrument(skip_all, fields(path = %path))]
    pub async fn post<T, B, Q>(
        &self,
        path: &str,
        body: &B,
        query: &Q,
        encoding: BodyEncoding,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        Q: Serialize + ?Sized,
    {
        let body = RequestBody::new(body, encoding)?;
        let response = self.execute(Method::POST, path, Some(body), query, true).await?;
        decode_optional(response)
    }

    /// Execute a POST request and return the body text undecoded
    ///
    /// # Errors
    ///
    /// Returns error if no valid token can be obtained or the request fails
    #[instrument(skip_all, fields(path = %path))]
    pub async fn post_raw<B, Q>(
        &self,
        path: &str,
        body: &B,
        query: &Q,
        encoding: BodyEncoding,
    ) -> Result<String, ApiError>
    where
        B: Serialize + ?Sized,
        Q: Serialize + ?Sized,
    {
        let body = RequestBody::new(body, encoding)?;
        Ok(self.execute(Method::POST, path, Some(body), query, false).await?.into_text())
    }

    /// Execute a PUT request
    ///
    /// Returns `None` when the response body is empty.
    ///
    /// # Errors
    ///
    /// Returns error if no valid token can be obtained, the request fails,
    /// or the response cannot be decoded
    #[instrument(skip_all, fields(path = %path))]
    pub async fn put<T, B, Q>(
        &self,
        path: &str,
        body: &B,
        query: &Q,
        encoding: BodyEncoding,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        Q: Serialize + ?Sized,
    {
        let body = RequestBody::new(body, encoding)?;
        let response = self.execute(Method::PUT, path, Some(body), query, true).await?;
        decode_optional(response)
    }

    /// Execute a DELETE request
    ///
    /// Returns `None` when the response body is empty.
    ///
    /// # Errors
    ///
    /// Returns error if no valid token can be obtained, the request fails,
    /// or the response cannot be decoded
    #[instrument(skip_all, fields(path = %path))]
    pub async fn delete<T, Q>(&self, path: &str, query: &Q) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.execute(Method::DELETE, path, None, query, true).await?;
        decode_optional(response)
    }

    /// Build, authenticate, send and decode one request
    ///
    /// Bodies are only sent with POST and PUT. The OAuth endpoints are
    /// called without bearer credentials; every other path requires a token.
    ///
    /// # Errors
    ///
    /// - [`ApiError::NoToken`] before any network attempt when no token is
    ///   held
    /// - [`ApiError::AuthExchange`] / [`ApiError::Persistence`] when the
    ///   expired token cannot be refreshed
    /// - [`ApiError::Request`] for a non-success response with a JSON body
    /// - [`ApiError::Transport`] for network failures and non-success
    ///   responses without a JSON body
    /// - [`ApiError::Decode`] when `decode` is set and the body is not JSON
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn execute<Q>(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        query: &Q,
        decode: bool,
    ) -> Result<ApiResponse, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_uri(), path);
        let mut request = self.http.request(method.clone(), &url).query(query);

        if !is_oauth_path(path) {
            let access_token = self.tokens.valid_access_token().await?;
            request = request.bearer_auth(access_token);
        }

        if let Some(body) = body {
            if method == Method::POST || method == Method::PUT {
                request = match body.encoding {
                    BodyEncoding::Json => request.json(&body.value),
                    BodyEncoding::Form => request.form(&body.value),
                };
            } else {
                debug!("dropping request body for a method that carries none");
            }
        }

        let response = self.http.send(request).await?;
        let status = response.status();
        let failure = response.error_for_status_ref().err();
        let text = response.text().await?;

        if let Some(err) = failure {
            warn!(%status, "request rejected");
            return Err(if is_json(&text) {
                ApiError::Request { status, body: text }
            } else {
                ApiError::Transport(err)
            });
        }

        debug!(%status, bytes = text.len(), "request succeeded");

        if !decode {
            return Ok(ApiResponse::Raw(text));
        }

        if text.trim().is_empty() {
            return Ok(ApiResponse::Json(Value::Null));
        }

        Ok(ApiResponse::Json(serde_json::from_str(&text)?))
    }
}

fn build_http_client(config: &ApiClientConfig) -> Result<HttpClient, ApiError> {
    let mut builder = HttpClient::builder()
        .timeout(config.timeout)
        .accept_invalid_certs(config.accept_invalid_certs);

    if let Some(agent) = &config.user_agent {
        builder = builder.user_agent(agent.clone());
    }

    Ok(builder.build()?)
}

fn decode_optional<T: DeserializeOwned>(response: ApiResponse) -> Result<Option<T>, ApiError> {
    match response.into_json() {
        Value::Null => Ok(None),
        value => Ok(Some(serde_json::from_value(value)?)),
    }
}

fn is_json(body: &str) -> bool {
    !body.trim().is_empty() && serde_json::from_str::<IgnoredAny>(body).is_ok()
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiClientConfig>,
    persistence: Option<Arc<dyn TokenPersistence>>,
}

impl ApiClientBuilder {
    /// Set the API configuration
    pub fn config(mut self, config: ApiClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the token persistence hook
    pub fn persistence(mut self, persistence: Arc<dyn TokenPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Set the token persistence hook from a closure
    pub fn on_token_updated<F>(self, callback: F) -> Self
    where
        F: Fn(&Token) -> Result<(), String> + Send + Sync + 'static,
    {
        self.persistence(Arc::new(FnPersistence::new(callback)))
    }

    /// Build the API client
    ///
    /// The token endpoint shares the request executor's HTTP client, so
    /// timeout and TLS settings apply to both.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is missing or client creation fails
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config =
            self.config.ok_or_else(|| ApiError::Config("client configuration not set".to_string()))?;

        let http = build_http_client(&config)?;
        let oauth_client = OAuthClient::with_http_client(config.oauth.clone(), http.inner().clone());

        let mut tokens = TokenManager::new(oauth_client);
        if let Some(persistence) = self.persistence {
            tokens = tokens.with_persistence(persistence);
        }

        ApiClient::assemble(config, http, tokens)
    }
}
