// Relay Network Layer - GraphQL request dispatch for Relay-style clients
//
// This library sends queries and mutations through a middleware pipeline
// over HTTP and settles every request with its data or a uniform error.

// Re-export core functionality
pub use relay_network_core::*;

// Re-export the HTTP transport crate
pub use relay_network_http;

pub use relay_network_http::{
    HttpClientConfig, HttpClientConfigBuilder, HttpClientError, ReqwestTransport, Response,
    RetryConfig, Transport, TransportRequest, transport_fn,
};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ErrorKind,
        GraphQLErrorsMiddleware,
        HttpClientConfig,
        HttpClientError,
        LoggerMiddleware,
        Middleware,
        NetworkLayer,
        NetworkLayerConfig,
        Next,
        Operation,
        PerfMiddleware,
        PipelineContext,
        RelayRequest,
        RelayRequestError,
        RequestIdMiddleware,
        RequestKind,
        Response,
        RetryConfig,
        RetryMiddleware,
        TimeoutMiddleware,
        Transport,
        UrlMiddleware,
    };
    pub use async_trait::async_trait;
}
