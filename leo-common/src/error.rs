//! Error types for Leo services.

use thiserror::Error;

/// Result type alias using the Leo error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Leo services.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request body over the configured size cap
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }

    /// Message safe to show to the caller, if any.
    ///
    /// Server-side errors return `None`; their details stay in the logs.
    pub fn client_message(&self) -> Option<&str> {
        match self {
            Self::InvalidInput(msg) | Self::PayloadTooLarge(msg) => Some(msg),
            Self::Config(_) | Self::Internal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::InvalidInput("empty".into()).status_code(), 400);
        assert_eq!(Error::PayloadTooLarge("big".into()).status_code(), 413);
        assert_eq!(Error::Internal("test".into()).status_code(), 500);
        assert_eq!(Error::Config("test".into()).status_code(), 500);
    }

    #[test]
    fn test_client_message_hides_server_errors() {
        let err = Error::InvalidInput("Message is required".into());
        assert_eq!(err.client_message(), Some("Message is required"));

        let err = Error::Internal("lock poisoned".into());
        assert_eq!(err.client_message(), None);
        assert_eq!(err.to_string(), "Internal error: lock poisoned");
    }
}
