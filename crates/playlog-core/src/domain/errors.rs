//! Domain error types
//!
//! Validation failures raised before a request ever reaches the network.
//! These are terminal: they are logged and never retried or queued.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A request is missing an identifier the server requires
    #[error("Missing required identifier: {0}")]
    MissingIdentifier(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
