//! Retrying middleware.

use async_trait::async_trait;
use relay_network_http::{HttpClientError, Response, Result, RetryConfig, RetryStrategy};
use tracing::debug;

use crate::{Middleware, Next, PipelineContext, RequestKind};

/// Repeats calls that time out, fail to connect, or come back with a
/// retryable status.
///
/// Each attempt gets its own timeout. When the status-based attempts run out
/// the last response is returned unchanged; when error-based attempts run out
/// the failure is reported as [`HttpClientError::RetryExhausted`].
/// Mutations are sent once unless [`allow_mutations`](Self::allow_mutations)
/// is set.
pub struct RetryMiddleware {
    config: RetryConfig,
    allow_mutations: bool,
}

impl RetryMiddleware {
    /// Create a retry middleware with the given policy.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            allow_mutations: false,
        }
    }

    /// Also retry mutations.
    pub fn allow_mutations(mut self) -> Self {
        self.allow_mutations = true;
        self
    }

    /// Get the retry policy.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    async fn attempt(&self, ctx: PipelineContext, next: &Next) -> Result<Response> {
        match self.config.fetch_timeout {
            Some(timeout) => tokio::time::timeout(timeout, next.run(ctx))
                .await
                .unwrap_or(Err(HttpClientError::Timeout(timeout))),
            None => next.run(ctx).await,
        }
    }
}

impl Default for RetryMiddleware {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[async_trait]
impl Middleware for RetryMiddleware {
    fn name(&self) -> &'static str {
        "retry"
    }

    async fn handle(&self, ctx: PipelineContext, next: Next) -> Result<Response> {
        if ctx.kind == RequestKind::Mutation && !self.allow_mutations {
            return self.attempt(ctx, &next).await;
        }

        let mut attempt = 0;
        loop {
            let mut attempt_ctx = ctx.clone();
            attempt_ctx.annotate("retry_attempt", attempt);

            match self.attempt(attempt_ctx, &next).await {
                Ok(response)
                    if self.config.should_retry_status(response.status().as_u16())
                        && self.config.has_attempts_left(attempt) =>
                {
                    debug!(
                        attempt = attempt + 1,
                        status = %response.status(),
                        requests = ?ctx.request_ids,
                        "Retrying GraphQL request due to status code"
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if self.config.should_retry(attempt, &e) => {
                    debug!(
                        attempt = attempt + 1,
                        error = %e,
                        requests = ?ctx.request_ids,
                        "Retrying GraphQL request due to error"
                    );
                }
                Err(e) if attempt > 0 && e.is_retryable() => {
                    return Err(HttpClientError::RetryExhausted {
                        attempts: attempt + 1,
                        message: e.detail(),
                    });
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.config.retry_delay(attempt)).await;
            attempt += 1;
        }
    }
}
