//! Buffered HTTP response.

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;

use crate::{HttpClientError, Result};

/// HTTP response with its body fully read.
///
/// Buffering lets the body be inspected by middlewares and parsed by the
/// classifier without consuming it, and lets a copy travel inside error
/// values for diagnostics.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    url: Option<url::Url>,
}

impl Response {
    /// Create a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            url: None,
        }
    }

    /// Create a response with a JSON body.
    pub fn json_body(status: StatusCode, body: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Self::new(status, headers, body.to_string())
    }

    /// Create a response with a plain-text body.
    pub fn text_body(status: StatusCode, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self::new(status, headers, body.into())
    }

    /// Create a response from a reqwest response, reading the whole body.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            headers,
            body,
            url: Some(url),
        })
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the status is in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the final URL, when the response came from the network.
    pub fn url(&self) -> Option<&url::Url> {
        self.url.as_ref()
    }

    /// Get the response body as bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Get the response body as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| HttpClientError::Body(e.to_string()))
    }

    /// Get the response body as text, replacing invalid UTF-8 sequences.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Get the content type if available.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
