//! Outbound transport request.

use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// A fully composed HTTP request handed to a [`Transport`](crate::Transport).
///
/// The URL is kept as a string so that relative endpoints such as `/graphql`
/// survive until the transport resolves them against its base URL.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL, absolute or relative to the transport's base URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Serialized request body.
    pub body: Option<String>,
}

impl TransportRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, ignoring names or values that are not valid HTTP.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Get a header as a string.
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }
}
