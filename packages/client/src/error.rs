//! Error types for the chat client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Session token was rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Server answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}
