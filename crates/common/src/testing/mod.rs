//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory implementations of
//!   [`OAuthClientTrait`](crate::auth::OAuthClientTrait) and
//!   [`TokenPersistence`](crate::auth::TokenPersistence)
//!
//! Enabled by the `test-utils` feature so downstream crates can drive the
//! token manager without a token endpoint.

pub mod mocks;

pub use mocks::{MockOAuthClient, RecordingPersistence};
