//! Built-in middlewares for logging, timing, URLs, timeouts and request ids.

use async_trait::async_trait;
use relay_network_http::{HttpClientError, Response, Result};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::{Middleware, Next, PipelineContext};

/// Callback invoked with `(request ids, status, elapsed)` after each call.
/// The status is `None` when no response was obtained.
pub type PerfCallbackFn = Arc<dyn Fn(&[String], Option<u16>, Duration) + Send + Sync>;

/// Computes a URL from the call context.
pub type UrlFn = Arc<dyn Fn(&PipelineContext) -> String + Send + Sync>;

/// Sets the URL of every call.
pub struct UrlMiddleware {
    url: UrlFn,
    batch_url: Option<UrlFn>,
}

impl UrlMiddleware {
    /// Send every call to a fixed URL.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            url: Arc::new(move |_: &PipelineContext| url.clone()),
            batch_url: None,
        }
    }

    /// Compute the URL per call.
    pub fn dynamic<F>(url: F) -> Self
    where
        F: Fn(&PipelineContext) -> String + Send + Sync + 'static,
    {
        Self {
            url: Arc::new(url),
            batch_url: None,
        }
    }

    /// Send batched calls to a different fixed URL.
    pub fn with_batch_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.batch_url = Some(Arc::new(move |_: &PipelineContext| url.clone()));
        self
    }
}

#[async_trait]
impl Middleware for UrlMiddleware {
    fn name(&self) -> &'static str {
        "url"
    }

    async fn before_send(&self, ctx: &mut PipelineContext) -> Result<Option<Response>> {
        ctx.url = match (&self.batch_url, ctx.batched) {
            (Some(batch_url), true) => batch_url(ctx),
            _ => (self.url)(ctx),
        };
        Ok(None)
    }
}

/// Fails calls that take longer than a fixed duration.
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    /// Create a new timeout middleware.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Middleware for TimeoutMiddleware {
    fn name(&self) -> &'static str {
        "timeout"
    }

    async fn handle(&self, ctx: PipelineContext, next: Next) -> Result<Response> {
        match tokio::time::timeout(self.timeout, next.run(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(HttpClientError::Timeout(self.timeout)),
        }
    }
}

/// Stamps every call with a unique id header.
///
/// The id is also left in the `request_id` annotation.
pub struct RequestIdMiddleware {
    header_name: String,
    counter: AtomicU64,
}

impl RequestIdMiddleware {
    /// Create a request id middleware using `X-Request-ID`.
    pub fn new() -> Self {
        Self::with_header("X-Request-ID")
    }

    /// Create with a custom header name.
    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            header_name: header.into(),
            counter: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{:x}-{:x}", nanos, seq)
    }
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    async fn before_send(&self, ctx: &mut PipelineContext) -> Result<Option<Response>> {
        let id = self.next_id();
        ctx.set_header(&self.header_name, &id);
        ctx.annotate("request_id", id);
        Ok(None)
    }
}

/// Logs every call and its outcome through `tracing`.
pub struct LoggerMiddleware {
    log_headers: bool,
    log_body: bool,
}

impl LoggerMiddleware {
    /// Create a new logger middleware.
    pub fn new() -> Self {
        Self {
            log_headers: false,
            log_body: false,
        }
    }

    /// Enable logging of headers.
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }

    /// Enable logging of request bodies.
    pub fn with_body(mut self) -> Self {
        self.log_body = true;
        self
    }
}

impl Default for LoggerMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for LoggerMiddleware {
    fn name(&self) -> &'static str {
        "logger"
    }

    async fn handle(&self, ctx: PipelineContext, next: Next) -> Result<Response> {
        tracing::debug!(
            method = %ctx.method,
            url = %ctx.url,
            kind = %ctx.kind,
            requests = ?ctx.request_ids,
            batched = ctx.batched,
            "Sending GraphQL request"
        );

        if self.log_headers {
            for (name, value) in &ctx.headers {
                tracing::trace!(header = %name, value = ?value, "Request header");
            }
        }
        if self.log_body {
            tracing::trace!(body = %ctx.body, "Request body");
        }

        let request_ids = ctx.request_ids.clone();
        let result = next.run(ctx).await;

        match &result {
            Ok(response) => {
                tracing::debug!(
                    status = %response.status(),
                    requests = ?request_ids,
                    "Received GraphQL response"
                );
                if self.log_headers {
                    for (name, value) in response.headers() {
                        tracing::trace!(header = %name, value = ?value, "Response header");
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, requests = ?request_ids, "GraphQL request failed");
            }
        }

        result
    }
}

/// Measures how long each call takes.
pub struct PerfMiddleware {
    on_complete: Option<PerfCallbackFn>,
}

impl PerfMiddleware {
    /// Log timings only.
    pub fn new() -> Self {
        Self { on_complete: None }
    }

    /// Log timings and report them to a callback.
    pub fn with_callback<F>(on_complete: F) -> Self
    where
        F: Fn(&[String], Option<u16>, Duration) + Send + Sync + 'static,
    {
        Self {
            on_complete: Some(Arc::new(on_complete)),
        }
    }
}

impl Default for PerfMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for PerfMiddleware {
    fn name(&self) -> &'static str {
        "perf"
    }

    async fn handle(&self, ctx: PipelineContext, next: Next) -> Result<Response> {
        let request_ids = ctx.request_ids.clone();
        let start = Instant::now();

        let result = next.run(ctx).await;
        let elapsed = start.elapsed();
        let status = result.as_ref().ok().map(|r| r.status().as_u16());

        tracing::debug!(
            requests = ?request_ids,
            status = ?status,
            elapsed_ms = elapsed.as_millis() as u64,
            "GraphQL request timing"
        );

        if let Some(on_complete) = &self.on_complete {
            on_complete(request_ids.as_slice(), status, elapsed);
        }

        result
    }
}

/// Logs GraphQL errors carried by successful responses.
///
/// The response itself is passed on untouched.
#[derive(Default)]
pub struct GraphQLErrorsMiddleware;

impl GraphQLErrorsMiddleware {
    /// Create a new GraphQL errors middleware.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for GraphQLErrorsMiddleware {
    fn name(&self) -> &'static str {
        "graphql_errors"
    }

    async fn after_receive(&self, ctx: &PipelineContext, response: Response) -> Result<Response> {
        if !response.is_success() {
            return Ok(response);
        }

        let Ok(payload) = response.json::<Value>() else {
            return Ok(response);
        };

        // Batched responses are arrays of payloads, possibly wrapped as {id, payload}.
        let payloads: Vec<&Value> = match &payload {
            Value::Array(entries) => entries
                .iter()
                .map(|entry| entry.get("payload").unwrap_or(entry))
                .collect(),
            single => vec![single],
        };

        for errors in payloads
            .into_iter()
            .filter_map(|p| p.get("errors").and_then(Value::as_array))
        {
            for error in errors {
                let error = crate::GraphQLResponseError::from_value(error);
                tracing::warn!(
                    requests = ?ctx.request_ids,
                    error = %error,
                    "GraphQL server returned an error"
                );
            }
        }

        Ok(response)
    }
}
