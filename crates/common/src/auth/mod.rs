//! OAuth 2.0 authorization-code infrastructure
//!
//! This module implements the client side of the provider's OAuth flow and
//! owns the token lifecycle used by the request executor.
//!
//! # Features
//!
//! - **Authorization link**: deterministic browser URL with optional `state`
//! - **Code exchange**: `grant_type=authorization_code` against `/OAuth/Token`
//! - **Lazy refresh**: an expired token is refreshed by the first request
//!   that needs it, exactly once for concurrent callers
//! - **Persistence hook**: every new token is handed to the caller
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  TokenManager   │  Token holder + refresh-on-expiry
//! └────────┬────────┘
//!          │
//!          ├──► OAuthClient        (token endpoint exchanges)
//!          └──► TokenPersistence   (caller-supplied storage hook)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use multivers_common::auth::{FnPersistence, OAuthClient, OAuthConfig, TokenManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OAuthConfig::multivers("client_id", "secret", "https://app.test/callback")
//!         .with_sandbox(true);
//!
//!     let manager = TokenManager::new(OAuthClient::new(config))
//!         .with_persistence(Arc::new(FnPersistence::new(|_token| Ok(()))));
//!
//!     println!("Visit: {}", manager.authorization_link(Some("csrf")));
//!
//!     // After the provider redirects back with ?code=...
//!     let token = manager.exchange_authorization_code("code-from-redirect").await?;
//!     println!("Token valid until {}", token.expires_at());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod token_manager;
pub mod traits;
pub mod types;

pub use client::{OAuthClient, OAuthClientError};
pub use token_manager::{TokenManager, TokenManagerError};
pub use traits::{FnPersistence, OAuthClientTrait, TokenPersistence};
pub use types::{OAuthConfig, Token, TokenResponse};
