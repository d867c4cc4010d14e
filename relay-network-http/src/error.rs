//! Transport error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, HttpClientError>;

/// Errors raised while obtaining an HTTP response.
///
/// Anything surfacing as this type means no usable response was received:
/// the network layer records it against the affected requests as a
/// network failure.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// Request failed after all retries exhausted.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last error message.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request building error.
    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    /// Body could not be read or decoded.
    #[error("Body error: {0}")]
    Body(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Raised by a middleware.
    #[error("{0}")]
    Middleware(String),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl HttpClientError {
    /// Create a middleware error from any message.
    pub fn middleware(message: impl Into<String>) -> Self {
        Self::Middleware(message.into())
    }

    /// The underlying condition's message, without the variant prefix that
    /// `Display` adds.
    pub fn detail(&self) -> String {
        match self {
            Self::RetryExhausted { message, .. } => message.clone(),
            Self::Connection(message)
            | Self::InvalidUrl(message)
            | Self::RequestBuild(message)
            | Self::Body(message)
            | Self::Json(message)
            | Self::Middleware(message) => message.clone(),
            Self::Http(e) => e.to_string(),
            Self::UrlParse(e) => e.to_string(),
            Self::Timeout(_) => self.to_string(),
        }
    }

    /// Check if this error is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_)) || matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if this is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_)) || matches!(self, Self::Http(e) if e.is_connect())
    }
}

impl From<serde_json::Error> for HttpClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
