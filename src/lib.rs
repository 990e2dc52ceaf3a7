//! # reqtrail
//!
//! Request logging for hyper services: every request gets a trace id, a
//! start line, an end line, and a body that can be read more than once.
//!
//! ## What the middleware does
//!
//! - **Trace ids**: reuses an inbound `x-trace-id` or generates a UUID v4,
//!   and echoes it on the response
//! - **Correlation ids**: passes `x-correlation-id` through untouched
//! - **Users**: asks a host-supplied [`PrincipalLookup`] for the username,
//!   treating any failure as "anonymous"
//! - **Bodies**: drains the request body once into memory so the log line and
//!   the handler both see the same bytes
//! - **Context**: publishes the [`RequestContext`] to nested code through
//!   [`context::current`] for exactly the lifetime of the request
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use reqtrail::{LoggingConfig, Request, Response, Router, Server, health};
//! use reqtrail::middleware::logging;
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let app = Router::new()
//!         .post("/orders", create_order)
//!         .get("/healthz", health::liveness);
//!     let app = logging::install(app, LoggingConfig::default(), None);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn create_order(mut req: Request) -> Response {
//!     let body = req.bytes().await.unwrap_or_default();
//!     Response::json(body)
//! }
//! ```

mod body;
mod client_ip;
mod config;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod context;
pub mod health;
pub mod middleware;

pub use body::{BodyReader, ReplayableBody};
pub use client_ip::resolve as resolve_client_ip;
pub use config::{LoggingConfig, should_skip};
pub use context::{Principal, PrincipalLookup, RequestContext, RequestContextResolver};
pub use error::{BoxError, Error};
pub use handler::{BoxFuture, Handler};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Server, serve_listener};
