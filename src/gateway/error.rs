//! Error types for the remote gateway.

use thiserror::Error;

/// Typed failure of a gateway call. Raw transport errors never cross the gateway boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// No credential, or the remote store rejected it (401).
    #[error("Not authenticated")]
    Unauthenticated,

    /// The request never got an answer.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// 5xx, or a response body that failed validation.
    #[error("Server fault ({status}): {message}")]
    ServerFault { status: u16, message: String },

    /// The addressed item does not exist (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote store refused the request as invalid (other 4xx).
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Failure of the underlying transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,
}
