//! # Relay Network Core
//!
//! Sends GraphQL queries and mutations over HTTP through a chain of
//! middlewares, and settles each request with either its `data` or a
//! uniform [`RelayRequestError`].
//!
//! ## Features
//!
//! - **Middleware chain**: Interceptors with `before_send`/`after_receive` hooks
//! - **Always settles**: `send_queries` never fails; errors land on each request
//! - **Error normalization**: Network, HTTP status, GraphQL and malformed payload failures
//! - **Batching**: Optionally send several queries in one call
//! - **Built-in middlewares**: URL, retry, timeout, request id, logging, timing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relay_network_core::{LoggerMiddleware, NetworkLayer, Operation, RelayRequest};
//! use relay_network_http::HttpClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let layer = NetworkLayer::builder()
//!         .http_config(HttpClientConfig::with_base_url("http://localhost:4000"))
//!         .middleware(LoggerMiddleware::new())
//!         .build()?;
//!
//!     let mut requests = vec![
//!         RelayRequest::query("1", Operation::new("query Viewer { viewer { id } }")),
//!     ];
//!     layer.send_queries(&mut requests).await;
//!
//!     match (requests[0].result(), requests[0].error()) {
//!         (Some(data), _) => println!("Data: {data}"),
//!         (_, Some(error)) => eprintln!("Error: {error}"),
//!         _ => unreachable!("every dispatched request is settled"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Middleware
//!
//! ```rust
//! use async_trait::async_trait;
//! use relay_network_core::{Middleware, PipelineContext};
//! use relay_network_http::{Response, Result};
//!
//! struct TraceHeader;
//!
//! #[async_trait]
//! impl Middleware for TraceHeader {
//!     async fn before_send(&self, ctx: &mut PipelineContext) -> Result<Option<Response>> {
//!         ctx.set_header("X-Trace", "on");
//!         Ok(None)
//!     }
//! }
//! ```

mod batch;
mod classify;
mod config;
mod context;
mod error;
mod interceptor;
mod middleware;
mod network;
mod request;
mod response;
mod retry;

pub use batch::{classify_batch, encode_batch};
pub use classify::{MalformedReason, Outcome, classify, classify_payload};
pub use config::{NetworkLayerConfig, NetworkLayerConfigBuilder};
pub use context::PipelineContext;
pub use error::{ErrorKind, RelayRequestError, normalize};
pub use interceptor::{
    GraphQLErrorsMiddleware, LoggerMiddleware, PerfCallbackFn, PerfMiddleware,
    RequestIdMiddleware, TimeoutMiddleware, UrlFn, UrlMiddleware,
};
pub use middleware::{Middleware, MiddlewareChain, Next};
pub use network::{NetworkLayer, NetworkLayerBuilder};
pub use request::{Operation, RelayRequest, RequestKind};
pub use response::{ErrorLocation, GraphQLResponseError, PathSegment, format_path};
pub use retry::RetryMiddleware;

// Re-export common types
pub use serde_json::Value as JsonValue;
