//! Middleware layer.
//!
//! Middleware intercepts a request before the route handler sees it and the
//! response after the handler returns. It is the right place for
//! cross-cutting concerns: request logging, trace-id injection, and
//! authentication-header inspection.
//!
//! A middleware is anything implementing [`Middleware`]: it receives the
//! [`Request`] and a [`Next`] and decides when (and whether) to call
//! [`Next::run`]. Plain async closures can be adapted with [`from_fn`]:
//!
//! ```rust,no_run
//! use reqtrail::{Request, Response, Router};
//! use reqtrail::middleware::{self, Next};
//!
//! async fn stamp(req: Request, next: Next) -> Response {
//!     let mut res = next.run(req).await;
//!     res.set_header(
//!         http::header::SERVER,
//!         http::HeaderValue::from_static("reqtrail"),
//!     );
//!     res
//! }
//!
//! let app = Router::new().layer(middleware::from_fn(stamp));
//! ```
//!
//! Layers run in registration order: the first one added is the outermost.
//!
//! Built-in middleware:
//! - [`logging`]: trace-id propagation and start/end request logging

pub mod logging;

use std::future::Future;
use std::sync::Arc;

use http::StatusCode;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Response;

/// A request interceptor.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;
}

pub(crate) type Stack = Arc<Vec<Arc<dyn Middleware>>>;

/// The rest of the chain: remaining middleware, then the route handler.
pub struct Next {
    stack: Stack,
    index: usize,
    endpoint: Option<BoxedHandler>,
}

impl Next {
    pub(crate) fn new(stack: Stack, endpoint: Option<BoxedHandler>) -> Self {
        Self { stack, index: 0, endpoint }
    }

    /// Passes `req` to the next layer and resolves to its response.
    ///
    /// Requests that matched no route end in `404 Not Found`.
    pub async fn run(mut self, req: Request) -> Response {
        match self.stack.get(self.index).cloned() {
            Some(layer) => {
                self.index += 1;
                layer.handle(req, self).await
            }
            None => match self.endpoint {
                Some(handler) => handler.call(req).await,
                None => Response::status(StatusCode::NOT_FOUND),
            },
        }
    }
}

/// Adapts an `async fn(Request, Next) -> Response` into a [`Middleware`].
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FromFn(f)
}

/// See [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self.0)(req, next))
    }
}
