//! API-specific error types
//!
//! One typed error channel for every failure the client can produce, plus a
//! coarse classification callers can base their own retry policy on.

use multivers_common::auth::{OAuthClientError, TokenManagerError};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// No usable credentials, or the provider refused them (401, 403)
    Authentication,
    /// The provider rejected the request (4xx except auth)
    Client,
    /// The provider failed or answered with something unreadable (5xx)
    Server,
    /// Network, TLS or timeout failure
    Network,
    /// Caller-side configuration mistake
    Config,
    /// The token persistence hook failed
    Storage,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authorization-code or refresh exchange failed
    #[error("authorization exchange failed: {0}")]
    AuthExchange(#[source] OAuthClientError),

    /// A token was required and none is held
    #[error("no token available; exchange an authorization code or restore a token first")]
    NoToken,

    /// Database-scoped call without a database set
    #[error("{0}")]
    Database(String),

    /// Non-success response carrying a JSON error body
    #[error("request failed with status {status}: {body}")]
    Request { status: StatusCode, body: String },

    /// Network, TLS, timeout or non-JSON error response
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A body could not be converted to or from JSON
    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The token persistence hook failed
    #[error("token persistence failed: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Message used when a database-scoped call runs before `set_database`
pub(crate) const DATABASE_REQUIRED: &str =
    "this function requires a database to be set, use ApiClient::set_database";

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::AuthExchange(_) | Self::NoToken => ApiErrorCategory::Authentication,
            Self::Request { status, .. } => classify_status(*status),
            Self::Transport(err) => match err.status() {
                Some(status) => classify_status(status),
                None if err.is_builder() => ApiErrorCategory::Config,
                None => ApiErrorCategory::Network,
            },
            Self::Decode(_) => ApiErrorCategory::Server,
            Self::Database(_) | Self::Config(_) => ApiErrorCategory::Config,
            Self::Persistence(_) => ApiErrorCategory::Storage,
        }
    }

    /// HTTP status of the failed response, when there was one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            Self::AuthExchange(OAuthClientError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Raw error payload of a [`ApiError::Request`]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Request { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Decode the error payload of a [`ApiError::Request`] into `T`
    ///
    /// Returns `None` for every other variant.
    pub fn payload<T: DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
        self.body().map(serde_json::from_str)
    }
}

fn classify_status(status: StatusCode) -> ApiErrorCategory {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ApiErrorCategory::Authentication
    } else if status.is_server_error() {
        ApiErrorCategory::Server
    } else {
        ApiErrorCategory::Client
    }
}

impl From<TokenManagerError> for ApiError {
    fn from(err: TokenManagerError) -> Self {
        match err {
            TokenManagerError::NoToken => Self::NoToken,
            TokenManagerError::Exchange(source) => Self::AuthExchange(source),
            TokenManagerError::Persistence(message) => Self::Persistence(message),
        }
    }
}
