//! Generic API client for Multivers and Boekhoudgemak
//!
//! This module provides the request executor and its error taxonomy. It
//! handles bearer authentication with inline token refresh, body encoding,
//! and response decoding for the remote REST API.
//!
//! # Architecture
//!
//! - Uses the crate's [`HttpClient`](crate::http::HttpClient) (no direct
//!   reqwest client construction)
//! - OAuth authentication through
//!   [`TokenManager`](multivers_common::auth::TokenManager)
//! - One request per call; the only retry is the expired-token refresh
//! - Structured tracing only, secrets never logged

pub mod client;
pub mod errors;

pub use client::{
    ApiClient, ApiClientBuilder, ApiClientConfig, ApiResponse, BodyEncoding, RequestBody,
    NO_QUERY,
};
pub use errors::{ApiError, ApiErrorCategory};
