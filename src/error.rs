//! Client Error Types
//!
//! Every fallible operation in this crate returns [`ClientError`]. Errors
//! are never recovered locally: the facade hands them to the caller as-is.

use crate::rpc::protocol::ServerError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error types for kb_blast client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Credentials were rejected, missing, or would leak over plain http
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Network or connection failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status without a JSON-RPC error body
    #[error("HTTP request failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Error object returned by the remote service
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Request or response (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed JSON-RPC envelope
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Endpoint or auth service URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether this error means the credentials were not accepted
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}
