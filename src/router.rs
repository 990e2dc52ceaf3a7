//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Middleware registered
//! with [`Router::layer`] wraps every request, matched or not.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{Middleware, Next, Stack};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every registration method returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    stack: Stack,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), stack: Arc::new(Vec::new()) }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use reqtrail::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Wraps all routes in `middleware`. The first layer added runs first.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        Arc::make_mut(&mut self.stack).push(Arc::new(middleware));
        self
    }

    /// Runs `req` through the middleware stack and the matching handler.
    ///
    /// This is what the server calls per request; it is public so services
    /// can be exercised in-process without a socket.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let endpoint = match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.set_params(params);
                Some(handler)
            }
            None => None,
        };
        Next::new(Arc::clone(&self.stack), endpoint).run(req).await
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Empty;

    use super::*;
    use crate::middleware::{self, Next};

    fn request(method: Method, uri: &str) -> Request {
        let peer: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let req = http::Request::builder().method(method).uri(uri).body(Empty::<Bytes>::new()).unwrap();
        Request::new(req, peer)
    }

    async fn echo_id(req: Request) -> String {
        req.param("id").unwrap_or("none").to_owned()
    }

    #[tokio::test]
    async fn routes_by_method_and_path() {
        let app = Router::new().get("/users/{id}", echo_id);

        let found = app.dispatch(request(Method::GET, "/users/42")).await;
        assert_eq!(found.body().as_ref(), b"42");

        let wrong_method = app.dispatch(request(Method::POST, "/users/42")).await;
        assert_eq!(wrong_method.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn layers_run_outermost_first_and_see_unmatched_requests() {
        async fn outer(req: Request, next: Next) -> Response {
            let mut res = next.run(req).await;
            let seen = res.header("x-order").unwrap_or_default().to_owned();
            res.set_header(
                http::HeaderName::from_static("x-order"),
                http::HeaderValue::from_str(&format!("{seen}outer")).unwrap(),
            );
            res
        }
        async fn inner(req: Request, next: Next) -> Response {
            let mut res = next.run(req).await;
            res.set_header(http::HeaderName::from_static("x-order"), http::HeaderValue::from_static("inner,"));
            res
        }

        let app = Router::new()
            .get("/", |_req: Request| async { "root" })
            .layer(middleware::from_fn(outer))
            .layer(middleware::from_fn(inner));

        for uri in ["/", "/missing"] {
            let res = app.dispatch(request(Method::GET, uri)).await;
            assert_eq!(res.header("x-order"), Some("inner,outer"));
        }
    }
}
