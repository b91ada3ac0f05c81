//! Thin reqwest wrapper shared by the token endpoint and the request
//! executor.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
