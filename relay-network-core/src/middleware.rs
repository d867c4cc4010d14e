//! Middleware chain wrapping the transport call.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use relay_network_http::{Response, Result, Transport};
use std::sync::Arc;

use crate::PipelineContext;

type Handler = Arc<dyn Fn(PipelineContext) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

/// Interceptor around the network call.
///
/// Most middlewares only implement the two hooks. `before_send` runs on the
/// way in, in registration order, and may return a substitute response to
/// skip the rest of the chain. `after_receive` runs on the way out, in
/// reverse order.
///
/// Override [`handle`](Middleware::handle) to take full control: catch or
/// transform downstream errors, or run the rest of the chain more than once.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Inspect or rewrite the call before it is sent.
    async fn before_send(&self, _ctx: &mut PipelineContext) -> Result<Option<Response>> {
        Ok(None)
    }

    /// Inspect or replace the response on its way back.
    async fn after_receive(&self, _ctx: &PipelineContext, response: Response) -> Result<Response> {
        Ok(response)
    }

    /// Process the call and invoke the rest of the chain.
    async fn handle(&self, mut ctx: PipelineContext, next: Next) -> Result<Response> {
        if let Some(response) = self.before_send(&mut ctx).await? {
            return Ok(response);
        }
        let response = next.run(ctx.clone()).await?;
        self.after_receive(&ctx, response).await
    }
}

/// The remainder of the chain after the current middleware.
///
/// Cloning is cheap, and the same `Next` may be run several times.
#[derive(Clone)]
pub struct Next {
    handler: Handler,
}

impl Next {
    /// Run the rest of the chain, ending with the transport call.
    pub async fn run(&self, ctx: PipelineContext) -> Result<Response> {
        (self.handler)(ctx).await
    }
}

/// Ordered middlewares composed over a transport.
///
/// The list is folded once, at construction, into a single handler; the chain
/// is immutable afterwards and can be shared between concurrent calls.
#[derive(Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
    entry: Next,
}

impl MiddlewareChain {
    /// Compose `middlewares` (first registered is outermost) over `transport`.
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>, transport: Arc<dyn Transport>) -> Self {
        let terminal: Handler = Arc::new(move |ctx: PipelineContext| {
            let transport = Arc::clone(&transport);
            async move { transport.send(ctx.into_transport_request()).await }.boxed()
        });

        let entry = middlewares.iter().rev().fold(
            Next { handler: terminal },
            |next, middleware| {
                let middleware = Arc::clone(middleware);
                let handler: Handler = Arc::new(move |ctx: PipelineContext| {
                    let middleware = Arc::clone(&middleware);
                    let next = next.clone();
                    async move { middleware.handle(ctx, next).await }.boxed()
                });
                Next { handler }
            },
        );

        Self { middlewares, entry }
    }

    /// Run a call through every middleware and the transport.
    pub async fn execute(&self, ctx: PipelineContext) -> Result<Response> {
        self.entry.run(ctx).await
    }

    /// Number of middlewares.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if the chain is a bare transport call.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Middleware names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }
}
