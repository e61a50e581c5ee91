//! Error types for the Jobs API client.
//!
//! # Design
//! Three failure classes reach callers: bad construction arguments
//! (`Configuration`), no response at all (`Transport`), and a response with a
//! non-2xx status (`Api`). `Api` carries the decoded body so callers can
//! diagnose the failure without re-fetching.

use crate::http::Payload;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by `ApiClient` and `ClientConfig`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid construction arguments (empty base URL or credential, bad env value).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The method string is not a valid HTTP token.
    #[error("invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A successful response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The JSON request body could not be serialized.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl Error {
    /// HTTP status for `Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Timeout))
    }
}

/// A response was received but carried a non-2xx status.
///
/// `message` is the status line prefix followed by
/// `" | Response body: <body>"`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    /// Parsed JSON when the body was valid JSON, raw text otherwise.
    pub body: Payload,
}

/// Failures before any response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("host not found: {0}")]
    HostNotFound(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("transport error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_message() {
        let err = Error::from(ApiError {
            status: 404,
            message: "404 Client Error: Not Found for url: http://x/a | Response body: gone".to_string(),
            body: Payload::Text("gone".to_string()),
        });
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().starts_with("404 Client Error"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn timeout_is_distinguishable() {
        let err = Error::from(TransportError::Timeout);
        assert!(err.is_timeout());
        assert_eq!(err.status(), None);
    }
}
