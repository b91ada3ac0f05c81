//! # Multivers Infrastructure
//!
//! HTTP-facing half of the Multivers / Boekhoudgemak client.
//!
//! This crate contains:
//! - The reqwest wrapper carrying timeout, TLS and base headers
//! - The request executor with bearer authentication and inline refresh
//! - The typed error channel
//! - Configuration loading from environment or TOML
//!
//! ## Architecture
//! - Token lifecycle, OAuth exchanges and base-URI resolution live in
//!   `multivers-common`
//! - Contains all "impure" code (network and file I/O)
//!
//! ## Usage Example
//!
//! ```no_run
//! use multivers_infra::{config, ApiClient, NO_QUERY};
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::builder()
//!         .config(config::load()?)
//!         .on_token_updated(|token| {
//!             tracing::info!(expires_at = %token.expires_at(), "store me");
//!             Ok(())
//!         })
//!         .build()?;
//!
//!     client.exchange_authorization_code("code-from-redirect").await?;
//!     client.set_database("MVL48759")?;
//!
//!     let path = client.database_path("/AdministrationInfoList")?;
//!     let info: Value = client.get(&path, NO_QUERY).await?;
//!     tracing::info!(%info, "administration info");
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod http;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientBuilder, ApiClientConfig, ApiError, ApiErrorCategory, ApiResponse,
    BodyEncoding, RequestBody, NO_QUERY,
};
pub use config::ConfigError;
pub use http::{HttpClient, HttpClientBuilder};
