//! Minimal reqtrail service: JSON endpoints behind the logging middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!   RUST_LOG=info REQTRAIL_CONFIG=app.toml cargo run --example basic
//!
//! Try:
//!   curl -H 'x-user: alice' 'http://localhost:3000/users/42?expand=orders'
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -H 'x-trace-id: demo-trace-1' \
//!        -d '{"name":"alice"}'
//!   curl http://localhost:3000/healthz        # excluded, no log lines

use std::sync::Arc;

use http::StatusCode;
use reqtrail::middleware::logging;
use reqtrail::{
    BoxError, LoggingConfig, Principal, PrincipalLookup, Request, Response, Router, Server,
    context, health,
};

/// Trusts an `x-user` header. Stand-in for a real authentication layer.
struct HeaderPrincipal;

impl PrincipalLookup for HeaderPrincipal {
    fn principal(&self, req: &Request) -> Result<Option<Principal>, BoxError> {
        Ok(req.header("x-user").map(Principal::authenticated))
    }
}

fn load_config() -> LoggingConfig {
    let Ok(path) = std::env::var("REQTRAIL_CONFIG") else {
        return LoggingConfig::default();
    };
    match std::fs::read_to_string(&path).map_err(BoxError::from).and_then(|s| {
        LoggingConfig::from_toml(&s).map_err(BoxError::from)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(%path, "using default logging config: {e}");
            LoggingConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .get("/users/{id}",    get_user)
        .post("/users",        create_user)
        .delete("/users/{id}", delete_user)
        .get("/healthz",       health::liveness)
        .get("/readyz",        health::readiness);

    let app = logging::install(app, load_config(), Some(Arc::new(HeaderPrincipal)));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    // Nested code finds the trace id without it being passed in.
    tracing::info!(trace = ?context::current_trace_id(), "loading user {id}");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users
//
// The middleware already drained the body for its log line; this read is
// served from the same buffer.
async fn create_user(mut req: Request) -> Response {
    match req.bytes().await {
        Ok(body) if !body.is_empty() => Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(body),
        _ => Response::status(StatusCode::BAD_REQUEST),
    }
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> Response {
    Response::status(StatusCode::NO_CONTENT)
}
