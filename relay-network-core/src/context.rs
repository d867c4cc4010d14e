//! Per-call pipeline state.

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use relay_network_http::TransportRequest;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::RequestKind;

/// State of one HTTP call as it travels through the middleware chain.
///
/// A context is created for every call the network layer makes and dropped
/// once the call completes. Middlewares may rewrite any field before the call
/// is sent and leave notes for each other in the annotations.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Target URL, absolute or relative to the transport's base URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request headers.
    pub headers: HeaderMap,
    /// Serialized JSON body.
    pub body: String,
    /// Kind of the request(s) covered by this call.
    pub kind: RequestKind,
    /// Ids of the requests covered by this call.
    pub request_ids: Vec<String>,
    /// Whether the body is a batch of several operations.
    pub batched: bool,
    annotations: HashMap<String, Value>,
}

impl PipelineContext {
    /// Create a POST context.
    pub fn new(
        url: impl Into<String>,
        kind: RequestKind,
        request_ids: Vec<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            headers: HeaderMap::new(),
            body: body.into(),
            kind,
            request_ids,
            batched: false,
            annotations: HashMap::new(),
        }
    }

    /// Set a header, ignoring names or values that are not valid HTTP.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
    }

    /// Get a header as a string.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Record a note for later middlewares.
    pub fn annotate(&mut self, key: impl Into<String>, value: impl Serialize) {
        self.annotations
            .insert(key.into(), serde_json::to_value(value).unwrap_or_default());
    }

    /// Read a note left by an earlier middleware.
    pub fn annotation(&self, key: &str) -> Option<&Value> {
        self.annotations.get(key)
    }

    /// All notes.
    pub fn annotations(&self) -> &HashMap<String, Value> {
        &self.annotations
    }

    /// Consume the context into the request handed to the transport.
    pub fn into_transport_request(self) -> TransportRequest {
        TransportRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: Some(self.body),
        }
    }
}
