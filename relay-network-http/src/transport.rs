//! The transport capability and its reqwest implementation.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::{HttpClientConfig, HttpClientError, Response, Result, TransportRequest};

/// Sends a composed request and returns the buffered response.
///
/// An `Err` means no HTTP response was obtained (DNS failure, refused or reset
/// connection, timeout). Any received response, whatever its status, is `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request.
    async fn send(&self, request: TransportRequest) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: TransportRequest) -> Result<Response> {
        (**self).send(request).await
    }
}

/// Transport backed by a `reqwest` client with connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
    config: Arc<HttpClientConfig>,
}

impl ReqwestTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .build()
            .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Create a transport resolving relative URLs against `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(HttpClientConfig::with_base_url(base_url))
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Resolve a request URL against the configured base URL.
    pub fn resolve_url(&self, url: &str) -> Result<url::Url> {
        match url::Url::parse(url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.config.base_url.as_deref().ok_or_else(|| {
                    HttpClientError::InvalidUrl(format!(
                        "relative URL `{url}` requires a configured base URL"
                    ))
                })?;
                Ok(url::Url::parse(base)?.join(url)?)
            }
            Err(e) => Err(HttpClientError::InvalidUrl(e.to_string())),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<Response> {
        let url = self.resolve_url(&request.url)?;
        debug!(method = %request.method, url = %url, "Sending HTTP request");

        let mut builder = self.inner.request(request.method, url);

        for (name, value) in &self.config.default_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = builder.headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        Response::from_reqwest(response).await
    }
}

/// Transport wrapping an async closure.
///
/// Useful for substituting the network deterministically in tests.
pub struct FnTransport<F> {
    f: F,
}

/// Create a transport from an async closure.
///
/// ```
/// use relay_network_http::{transport_fn, HttpClientError, TransportRequest};
///
/// let offline = transport_fn(|_request: TransportRequest| async {
///     Err(HttpClientError::Connection("offline".to_string()))
/// });
/// # let _ = offline;
/// ```
pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(TransportRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    FnTransport { f }
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(TransportRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    async fn send(&self, request: TransportRequest) -> Result<Response> {
        (self.f)(request).await
    }
}
