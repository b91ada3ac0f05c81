//! Shared building blocks for the Multivers API client.
//!
//! # Modules
//!
//! - [`endpoint`]: base-URI resolution per platform and deployment, OAuth
//!   endpoint paths and the headers every request carries
//! - [`auth`]: the [`Token`](auth::Token) value object, the OAuth
//!   authorization-code client and the token lifecycle manager
//! - `testing` (feature `test-utils`): in-memory mocks for the auth seams

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod endpoint;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use auth::{
    FnPersistence, OAuthClient, OAuthClientError, OAuthClientTrait, OAuthConfig, Token,
    TokenManager, TokenManagerError, TokenPersistence, TokenResponse,
};
pub use endpoint::{ApiTarget, BaseUriResolver, Deployment, FixedBaseUri};
