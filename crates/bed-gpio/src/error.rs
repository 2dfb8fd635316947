//! Hardware gateway error types.

use thiserror::Error;

/// Errors that can occur talking to the local GPIO endpoint.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Connection refused, reset, or timed out before a response arrived.
    #[error("gateway unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The endpoint answered with a non-success status.
    #[error("gateway returned HTTP {status} for {url}")]
    Protocol { url: String, status: u16 },

    /// The response body was not the expected JSON document.
    #[error("gateway response decode error: {0}")]
    Decode(String),

    /// The HTTP client itself could not be constructed.
    #[error("gateway client error: {0}")]
    Client(String),
}

/// Convenience alias for gateway results.
pub type GatewayResult<T> = Result<T, GatewayError>;
