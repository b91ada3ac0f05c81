use std::time::Duration;

use multivers_common::endpoint::base_headers;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::{debug, warn};

/// HTTP client with a per-request timeout and the provider's base headers.
///
/// Sends each request exactly once; transient failures are returned to the
/// caller as-is.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Returns error if the TLS backend cannot be initialized
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder once.
    ///
    /// # Errors
    /// Returns the reqwest error unchanged on build, connect, TLS or timeout
    /// failure
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, reqwest::Error> {
        let request = builder.build()?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, url = %url.path(), "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, url = %url.path(), status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, url = %url.path(), error = %err, "HTTP request failed");
                Err(err)
            }
        }
    }

    /// The underlying reqwest client, for sharing its pool and TLS settings.
    pub fn inner(&self) -> &ReqwestClient {
        &self.client
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: reqwest::header::HeaderMap,
    accept_invalid_certs: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            default_headers: base_headers(),
            accept_invalid_certs: false,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Add headers on top of the base headers; later values win.
    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers.extend(headers);
        self
    }

    /// Disable TLS certificate verification.
    ///
    /// Only for self-signed sandbox gateways. Logged at `warn` on build.
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// # Errors
    /// Returns error if the TLS backend cannot be initialized
    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).default_headers(self.default_headers);

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if self.accept_invalid_certs {
            warn!("TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(HttpClient { client: builder.build()? })
    }
}
