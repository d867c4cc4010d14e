//! # Relay Network HTTP
//!
//! The HTTP transport capability used by the Relay network layer.
//!
//! The network layer never talks to a global HTTP client. It is handed a
//! [`Transport`], which turns a composed [`TransportRequest`] into a buffered
//! [`Response`] or an [`HttpClientError`] when no response could be obtained.
//!
//! ## Features
//!
//! - **Reqwest transport**: Connection pooling, gzip, relative URL resolution
//! - **Closure transports**: Substitute the network in tests with [`transport_fn`]
//! - **Buffered responses**: Bodies can be read as text or JSON any number of times
//! - **Retry policy**: Backoff strategies shared with retrying middlewares
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relay_network_http::{ReqwestTransport, Transport, TransportRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = ReqwestTransport::with_base_url("http://localhost:4000")?;
//!
//!     let response = transport
//!         .send(
//!             TransportRequest::post("/graphql")
//!                 .header("Content-Type", "application/json")
//!                 .body(r#"{"query":"{ viewer { id } }"}"#),
//!         )
//!         .await?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod request;
mod response;
mod retry;
mod transport;

pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use error::{HttpClientError, Result};
pub use request::TransportRequest;
pub use response::Response;
pub use retry::{BackoffStrategy, RetryConfig, RetryStrategy};
pub use transport::{FnTransport, ReqwestTransport, Transport, transport_fn};

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use url::Url;
