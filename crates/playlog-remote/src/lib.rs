//! Playlog Remote - HTTP client for the telemetry service
//!
//! Implements [`IRemoteClient`](playlog_core::ports::IRemoteClient) over
//! JSON/HTTP with `reqwest`.
//!
//! ## Modules
//!
//! - [`client`] - Endpoint construction, headers, response decoding

pub mod client;

pub use client::HttpRemoteClient;

use thiserror::Error;

/// Errors raised while building the client
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The base URL is not an http(s) URL
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be created
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
