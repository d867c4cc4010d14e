//! The network layer: request dispatch.

use futures::future::join_all;
use relay_network_http::{
    HttpClientConfig, HttpClientError, ReqwestTransport, Result, Transport,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::batch::{classify_batch, encode_batch};
use crate::classify::classify;
use crate::error::normalize;
use crate::{
    Middleware, MiddlewareChain, NetworkLayerConfig, PipelineContext, RelayRequest,
    RelayRequestError, RequestKind,
};

/// Sends Relay requests through the middleware chain and settles them.
///
/// Dispatch never fails as a whole: every failure is recorded on the request
/// it belongs to, so callers can inspect partial success across a batch.
#[derive(Clone)]
pub struct NetworkLayer {
    chain: Arc<MiddlewareChain>,
    config: Arc<NetworkLayerConfig>,
}

impl NetworkLayer {
    /// Create a network layer builder.
    pub fn builder() -> NetworkLayerBuilder {
        NetworkLayerBuilder::default()
    }

    /// Create a network layer over a transport with default configuration.
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>, transport: Arc<dyn Transport>) -> Self {
        Self::with_config(middlewares, transport, NetworkLayerConfig::default())
    }

    /// Create a network layer with custom configuration.
    pub fn with_config(
        middlewares: Vec<Arc<dyn Middleware>>,
        transport: Arc<dyn Transport>,
        config: NetworkLayerConfig,
    ) -> Self {
        Self {
            chain: Arc::new(MiddlewareChain::new(middlewares, transport)),
            config: Arc::new(config),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkLayerConfig {
        &self.config
    }

    /// Get the middleware chain.
    pub fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }

    /// Report whether every named optional capability is supported.
    ///
    /// The layer implements no optional capabilities (such as deferred
    /// queries), so this is only true for an empty list.
    pub fn supports(&self, capabilities: &[&str]) -> bool {
        capabilities.is_empty()
    }

    /// Send requests and wait until every one of them is settled.
    ///
    /// Queries are batched when batching is enabled; mutations are always
    /// sent on their own. Requests that are already settled are skipped.
    ///
    /// ```
    /// use relay_network_core::{NetworkLayer, Operation, RelayRequest};
    /// use relay_network_http::{HttpClientError, TransportRequest, transport_fn};
    ///
    /// # tokio_test::block_on(async {
    /// let layer = NetworkLayer::builder()
    ///     .transport(transport_fn(|_: TransportRequest| async {
    ///         Err(HttpClientError::Connection("offline".to_string()))
    ///     }))
    ///     .build()
    ///     .unwrap();
    ///
    /// let mut requests = vec![RelayRequest::query("1", Operation::new("{ viewer { id } }"))];
    /// layer.send_queries(&mut requests).await;
    ///
    /// assert!(requests[0].error().unwrap().is_network_error());
    /// # });
    /// ```
    pub async fn send_queries(&self, requests: &mut [RelayRequest]) {
        let mut singles: Vec<&mut RelayRequest> = Vec::new();
        let mut batchable: Vec<&mut RelayRequest> = Vec::new();

        for request in requests.iter_mut() {
            if request.is_settled() {
                debug!(id = %request.id(), "Skipping already settled request");
            } else if self.config.batching && request.kind() == RequestKind::Query {
                batchable.push(request);
            } else {
                singles.push(request);
            }
        }

        if singles.is_empty() && batchable.is_empty() {
            return;
        }

        debug!(
            count = singles.len() + batchable.len(),
            batched = batchable.len(),
            "Sending relay requests"
        );

        let mut groups: Vec<Vec<&mut RelayRequest>> =
            singles.into_iter().map(|request| vec![request]).collect();

        let max_batch_size = self.config.max_batch_size.max(1);
        let mut batchable = batchable.into_iter().peekable();
        while batchable.peek().is_some() {
            groups.push(batchable.by_ref().take(max_batch_size).collect());
        }

        join_all(groups.into_iter().map(|group| self.dispatch(group))).await;
    }

    /// Send a single mutation and wait until it is settled.
    pub async fn send_mutation(&self, request: &mut RelayRequest) {
        if request.is_settled() {
            debug!(id = %request.id(), "Skipping already settled request");
            return;
        }
        self.dispatch_single(request).await;
    }

    /// Send one request and return it settled.
    pub async fn send(&self, mut request: RelayRequest) -> RelayRequest {
        self.send_queries(std::slice::from_mut(&mut request)).await;
        request
    }

    async fn dispatch(&self, mut group: Vec<&mut RelayRequest>) {
        if group.len() == 1 {
            if let Some(request) = group.pop() {
                self.dispatch_single(request).await;
            }
        } else {
            self.dispatch_batch(group).await;
        }
    }

    async fn dispatch_single(&self, request: &mut RelayRequest) {
        let body = match serde_json::to_string(request.operation()) {
            Ok(body) => body,
            Err(e) => {
                let e: HttpClientError = e.into();
                request.settle(Err(RelayRequestError::network(&e)));
                return;
            }
        };

        let ctx = self.context(
            self.config.endpoint.clone(),
            request.kind(),
            vec![request.id().to_string()],
            body,
        );

        let outcome = match self.chain.execute(ctx).await {
            Ok(response) => classify(&response),
            Err(e) => {
                warn!(id = %request.id(), error = %e, "Relay request failed before a response");
                request.settle(Err(RelayRequestError::network(&e)));
                return;
            }
        };

        let settled = normalize(outcome, request.kind(), request.debug_name());
        if let Err(e) = &settled {
            debug!(id = %request.id(), kind = ?e.kind(), "Relay request rejected");
        }
        request.settle(settled);
    }

    async fn dispatch_batch(&self, mut group: Vec<&mut RelayRequest>) {
        let ids: Vec<String> = group.iter().map(|r| r.id().to_string()).collect();

        let body = match encode_batch(group.iter().map(|r| &**r)) {
            Ok(body) => body,
            Err(e) => {
                let e: HttpClientError = e.into();
                settle_all(&mut group, |_| Err(RelayRequestError::network(&e)));
                return;
            }
        };

        let mut ctx = self.context(
            self.config.batch_endpoint(),
            RequestKind::Query,
            ids.clone(),
            body,
        );
        ctx.batched = true;

        debug!(count = ids.len(), "Executing batch request");

        match self.chain.execute(ctx).await {
            Ok(response) => {
                let mut outcomes = classify_batch(&response, &ids).into_iter();
                settle_all(&mut group, |request| match outcomes.next() {
                    Some(outcome) => normalize(outcome, request.kind(), request.debug_name()),
                    None => Err(RelayRequestError::network(&HttpClientError::Body(
                        "batch outcome missing".to_string(),
                    ))),
                });
            }
            Err(e) => {
                warn!(count = ids.len(), error = %e, "Batch request failed before a response");
                settle_all(&mut group, |_| Err(RelayRequestError::network(&e)));
            }
        }
    }

    fn context(
        &self,
        url: String,
        kind: RequestKind,
        request_ids: Vec<String>,
        body: String,
    ) -> PipelineContext {
        let mut ctx = PipelineContext::new(url, kind, request_ids, body);
        for (name, value) in &self.config.default_headers {
            ctx.set_header(name, value);
        }
        ctx.set_header("Accept", "application/json");
        ctx.set_header("Content-Type", "application/json");
        ctx
    }
}

fn settle_all<F>(group: &mut [&mut RelayRequest], mut outcome: F)
where
    F: FnMut(&RelayRequest) -> std::result::Result<serde_json::Value, RelayRequestError>,
{
    for request in group.iter_mut() {
        let settled = outcome(&**request);
        request.settle(settled);
    }
}

/// Builder for [`NetworkLayer`].
#[derive(Default)]
pub struct NetworkLayerBuilder {
    middlewares: Vec<Arc<dyn Middleware>>,
    transport: Option<Arc<dyn Transport>>,
    http_config: Option<HttpClientConfig>,
    config: NetworkLayerConfig,
}

impl NetworkLayerBuilder {
    /// Append a middleware; the first one added is the outermost.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Append an already shared middleware.
    pub fn middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Use a specific transport.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Configure the default reqwest transport.
    pub fn http_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = Some(config);
        self
    }

    /// Set the layer configuration.
    pub fn config(mut self, config: NetworkLayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the GraphQL endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Enable query batching.
    pub fn batching(mut self, enabled: bool) -> Self {
        self.config.batching = enabled;
        self
    }

    /// Build the network layer.
    ///
    /// Without an explicit transport a [`ReqwestTransport`] is created, which
    /// can fail if the TLS backend cannot be initialized.
    pub fn build(self) -> Result<NetworkLayer> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                self.http_config.unwrap_or_default(),
            )?),
        };

        Ok(NetworkLayer::with_config(
            self.middlewares,
            transport,
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Operation};
    use relay_network_http::{Response, StatusCode, TransportRequest, transport_fn};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    fn layer_with<F, Fut>(config: NetworkLayerConfig, f: F) -> NetworkLayer
    where
        F: Fn(TransportRequest) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response>> + Send + 'static,
    {
        NetworkLayer::with_config(Vec::new(), Arc::new(transport_fn(f)), config)
    }

    fn query(id: &str) -> RelayRequest {
        RelayRequest::query(id, Operation::new("{ viewer { id } }"))
    }

    #[tokio::test]
    async fn test_mixed_outcomes_settle_independently() {
        let layer = layer_with(NetworkLayerConfig::default(), |request: TransportRequest| async move {
            let body: Value =
                serde_json::from_str(request.body.as_deref().unwrap_or("{}")).unwrap_or_default();
            match body["operationName"].as_str() {
                Some("Ok") => Ok(Response::json_body(StatusCode::OK, &json!({ "data": { "ok": true } }))),
                Some("Down") => Err(HttpClientError::Connection("Network connection error".into())),
                _ => Ok(Response::text_body(StatusCode::INTERNAL_SERVER_ERROR, "boom")),
            }
        });

        let mut requests = vec![
            RelayRequest::query("1", Operation::new("query Ok { ok }").operation_name("Ok")),
            RelayRequest::query("2", Operation::new("query Down { a }").operation_name("Down")),
            RelayRequest::query("3", Operation::new("{ b }")),
        ];
        layer.send_queries(&mut requests).await;

        assert!(requests.iter().all(|r| r.is_settled()));
        assert_eq!(requests[0].result(), Some(&json!({ "ok": true })));
        assert_eq!(requests[1].error().unwrap().kind(), ErrorKind::Network);
        assert_eq!(requests[2].error().unwrap().status(), Some(500));
    }

    #[tokio::test]
    async fn test_context_has_json_headers() {
        let seen: Arc<Mutex<Vec<TransportRequest>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let config = NetworkLayerConfig::builder().header("X-App", "todo").build();
        let layer = layer_with(config, move |request: TransportRequest| {
            sink.lock().unwrap().push(request);
            async { Ok(Response::json_body(StatusCode::OK, &json!({ "data": {} }))) }
        });

        layer.send(query("1")).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].url, "/graphql");
        assert_eq!(seen[0].method, http::Method::POST);
        assert_eq!(seen[0].header_str("content-type"), Some("application/json"));
        assert_eq!(seen[0].header_str("x-app"), Some("todo"));
        let body: Value = serde_json::from_str(seen[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "query": "{ viewer { id } }" }));
    }

    #[tokio::test]
    async fn test_batching_groups_queries() {
        let calls: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&calls);
        let config = NetworkLayerConfig::builder().batching(true).max_batch_size(2).build();
        let layer = layer_with(config, move |request: TransportRequest| {
            sink.lock().unwrap().push(request.url.clone());
            async move {
                let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("null"))
                    .unwrap_or_default();
                let answer = match body {
                    Value::Array(entries) => Value::Array(
                        entries
                            .iter()
                            .map(|e| json!({ "id": e["id"], "payload": { "data": { "id": e["id"] } } }))
                            .collect(),
                    ),
                    _ => json!({ "data": { "single": true } }),
                };
                Ok(Response::json_body(StatusCode::OK, &answer))
            }
        });

        let mut requests = vec![
            query("1"),
            query("2"),
            query("3"),
            RelayRequest::mutation("4", Operation::new("mutation { m }")),
        ];
        layer.send_queries(&mut requests).await;

        let mut calls = calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["/graphql", "/graphql", "/graphql/batch"]);

        assert_eq!(requests[0].result(), Some(&json!({ "id": "1" })));
        assert_eq!(requests[1].result(), Some(&json!({ "id": "2" })));
        // The third query is alone in its chunk and goes out unbatched.
        assert_eq!(requests[2].result(), Some(&json!({ "single": true })));
        assert_eq!(requests[3].result(), Some(&json!({ "single": true })));
    }

    #[tokio::test]
    async fn test_batch_transport_failure_rejects_every_request() {
        let config = NetworkLayerConfig::builder().batching(true).build();
        let layer = layer_with(config, |_| async {
            Err(HttpClientError::Connection("Network connection error".into()))
        });

        let mut requests = vec![query("1"), query("2")];
        layer.send_queries(&mut requests).await;

        for request in &requests {
            let error = request.error().unwrap();
            assert!(error.is_network_error());
            assert_eq!(error.message(), "Network connection error");
        }
    }

    #[tokio::test]
    async fn test_settled_requests_are_skipped() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let layer = layer_with(NetworkLayerConfig::default(), move |_| {
            *counter.lock().unwrap() += 1;
            async { Ok(Response::json_body(StatusCode::OK, &json!({ "data": {} }))) }
        });

        let mut requests = vec![layer.send(query("1")).await];
        layer.send_queries(&mut requests).await;
        layer.send_queries(&mut []).await;

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_send_mutation() {
        let layer = layer_with(NetworkLayerConfig::default(), |_| async {
            Ok(Response::json_body(
                StatusCode::OK,
                &json!({ "errors": [{ "message": "not allowed" }] }),
            ))
        });

        let mut request = RelayRequest::mutation(
            "m1",
            Operation::new("mutation AddTodo { addTodo { id } }").operation_name("AddTodo"),
        );
        layer.send_mutation(&mut request).await;

        let error = request.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::GraphQLErrors);
        assert!(error.message().starts_with("Server request for mutation `AddTodo` failed"));
        assert!(request.result().is_none());
    }

    #[test]
    fn test_supports() {
        let layer = layer_with(NetworkLayerConfig::default(), |_| async {
            Ok(Response::text_body(StatusCode::OK, ""))
        });
        assert!(!layer.supports(&["defer"]));
        assert!(layer.supports(&[]));
    }

    #[test]
    fn test_builder_with_transport() {
        let layer = NetworkLayer::builder()
            .endpoint("https://api.example.com/graphql")
            .batching(true)
            .middleware(crate::LoggerMiddleware::new())
            .transport(transport_fn(|_| async {
                Ok(Response::text_body(StatusCode::OK, ""))
            }))
            .build()
            .unwrap();

        assert_eq!(layer.config().endpoint, "https://api.example.com/graphql");
        assert!(layer.config().batching);
        assert_eq!(layer.chain().len(), 1);
    }
}
