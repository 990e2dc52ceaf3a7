//! Request logging with trace-id propagation.
//!
//! For every request whose path is not excluded, the middleware:
//!
//! 1. resolves a [`RequestContext`] (trace id, correlation id, username),
//! 2. captures the body so it can be logged *and* handed to the handler,
//! 3. logs an `Incoming …` line,
//! 4. runs the rest of the chain inside a `request` span with the context
//!    published for [`context::current`],
//! 5. logs a `Completed …` line with status and duration,
//! 6. stamps `x-trace-id` on the response.
//!
//! Step 5 runs from a drop guard, so it also fires when the handler panics or
//! the request future is dropped. The task-local context is released right
//! after, when the scope future ends.
//!
//! Log lines use two fixed templates per log point (with and without a
//! username) so that line-oriented parsers can rely on their shape:
//!
//! ```text
//! [{trace}] [{user}] Incoming {method} request to {path} from IP {ip} | Params: {params} | Body: {body}
//! [{trace}] Incoming {method} request to {path} from IP {ip} | Params: {params} | Body: {body}
//! [{trace}] [{user}] Completed {method} request to {path} with status {status} in {ms} ms
//! [{trace}] Completed {method} request to {path} with status {status} in {ms} ms
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use tracing::{Instrument, debug, field, info, info_span, warn};

use crate::client_ip;
use crate::config::{LoggingConfig, should_skip};
use crate::context::{self, PrincipalLookup, RequestContext, RequestContextResolver, TRACE_ID_HEADER};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// Longest body prefix, in characters, written to the incoming line.
pub const MAX_LOGGED_BODY_CHARS: usize = 1000;

const TRUNCATED_MARKER: &str = "...(truncated)";

/// Logged as the status when the handler panicked before producing a response.
const STATUS_HANDLER_PANICKED: u16 = 500;

/// Logged as the status when the request future was dropped mid-handler.
const STATUS_CLIENT_CLOSED: u16 = 499;

/// The request logging middleware. Cheap to clone.
#[derive(Clone, Debug)]
pub struct LoggingMiddleware {
    config: Arc<LoggingConfig>,
    resolver: RequestContextResolver,
}

impl LoggingMiddleware {
    /// Builds the middleware after validating `config`.
    pub fn try_new(config: LoggingConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config: Arc::new(config), resolver: RequestContextResolver::new() })
    }

    /// Consults `lookup` for the username when `include_user` is set.
    pub fn with_principal_lookup(mut self, lookup: Arc<dyn PrincipalLookup>) -> Self {
        self.resolver = RequestContextResolver::with_principal_lookup(lookup);
        self
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    async fn process(self, req: Request, next: Next) -> Response {
        if !self.config.enabled || should_skip(req.path(), &self.config.exclude_paths) {
            return next.run(req).await;
        }

        let ctx = self.resolver.resolve(&req, &self.config);

        let span = info_span!(
            "request",
            trace_id = %ctx.trace_id(),
            correlation_id = field::Empty,
            user = field::Empty
        );
        if let Some(id) = ctx.correlation_id() {
            span.record("correlation_id", id);
        }
        if let Some(user) = ctx.username() {
            span.record("user", user);
        }

        let observed = self.observe(req, next, ctx.clone()).instrument(span);
        let mut response = context::scope(ctx.clone(), observed).await;

        if let Ok(value) = HeaderValue::from_str(ctx.trace_id()) {
            response.set_header(HeaderName::from_static(TRACE_ID_HEADER), value);
        }
        response
    }

    async fn observe(&self, mut req: Request, next: Next, ctx: RequestContext) -> Response {
        let body = match req.body_mut().capture().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("could not read request body: {e}");
                Bytes::new()
            }
        };

        let incoming = IncomingRequest::new(&req, &ctx, &self.config, &body);
        info!(target: "reqtrail::http", "{incoming}");

        let mut completion = Completion {
            line: CompletedRequest {
                trace_id: ctx.trace_id().to_owned(),
                username: ctx.username().map(str::to_owned),
                method: req.method().to_string(),
                path: req.path().to_owned(),
                status: STATUS_CLIENT_CLOSED,
                duration_ms: 0,
            },
            started: Instant::now(),
            finished: false,
        };

        let response = next.run(req).await;
        completion.line.status = response.status_code().as_u16();
        completion.finished = true;
        drop(completion);

        response
    }
}

impl Middleware for LoggingMiddleware {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin(self.clone().process(req, next))
    }
}

/// Adds request logging to `router`, failing open.
///
/// With `enabled = false` the router is returned untouched. If the middleware
/// cannot be built from `config`, a warning is logged and the router is also
/// returned untouched: the service keeps running, just without request logs.
pub fn install(
    router: Router,
    config: LoggingConfig,
    lookup: Option<Arc<dyn PrincipalLookup>>,
) -> Router {
    if !config.enabled {
        debug!("request logging disabled by configuration");
        return router;
    }
    match LoggingMiddleware::try_new(config) {
        Ok(mw) => match lookup {
            Some(lookup) => router.layer(mw.with_principal_lookup(lookup)),
            None => router.layer(mw),
        },
        Err(e) => {
            warn!("request logging not installed: {e}");
            router
        }
    }
}

// ── Completion guard ──────────────────────────────────────────────────────────

/// Emits the completed line when dropped, whichever way the handler exits.
struct Completion {
    line: CompletedRequest,
    started: Instant,
    finished: bool,
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.finished && std::thread::panicking() {
            self.line.status = STATUS_HANDLER_PANICKED;
        }
        self.line.duration_ms = self.started.elapsed().as_millis();
        info!(target: "reqtrail::http", "{}", self.line);
    }
}

// ── Log lines ─────────────────────────────────────────────────────────────────

/// The `Incoming …` log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    pub trace_id: String,
    pub username: Option<String>,
    pub method: String,
    pub path: String,
    pub client_ip: String,
    pub params: String,
    pub body: String,
}

impl IncomingRequest {
    pub fn new(req: &Request, ctx: &RequestContext, config: &LoggingConfig, body: &[u8]) -> Self {
        let path = match req.query() {
            Some(q) if config.include_query_string && !q.is_empty() => format!("{}?{q}", req.path()),
            _ => req.path().to_owned(),
        };

        Self {
            trace_id: ctx.trace_id().to_owned(),
            username: ctx.username().map(str::to_owned),
            method: req.method().to_string(),
            path,
            client_ip: client_ip::resolve(req.headers(), req.remote_addr()),
            params: render_params(req, body),
            body: truncate_body(&String::from_utf8_lossy(body)),
        }
    }
}

impl fmt::Display for IncomingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { trace_id, username, method, path, client_ip, params, body } = self;
        match username {
            Some(user) => write!(
                f,
                "[{trace_id}] [{user}] Incoming {method} request to {path} from IP {client_ip} | Params: {params} | Body: {body}"
            ),
            None => write!(
                f,
                "[{trace_id}] Incoming {method} request to {path} from IP {client_ip} | Params: {params} | Body: {body}"
            ),
        }
    }
}

/// The `Completed …` log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRequest {
    pub trace_id: String,
    pub username: Option<String>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: u128,
}

impl fmt::Display for CompletedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { trace_id, username, method, path, status, duration_ms } = self;
        match username {
            Some(user) => write!(
                f,
                "[{trace_id}] [{user}] Completed {method} request to {path} with status {status} in {duration_ms} ms"
            ),
            None => write!(
                f,
                "[{trace_id}] Completed {method} request to {path} with status {status} in {duration_ms} ms"
            ),
        }
    }
}

/// Parameter values grouped by key, keys in first-seen order.
#[derive(Default)]
struct ParamGroups {
    groups: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl ParamGroups {
    fn extend(&mut self, pairs: form_urlencoded::Parse<'_>) {
        for (key, value) in pairs {
            match self.index.get(&*key) {
                Some(&i) => self.groups[i].1.push(value.into_owned()),
                None => {
                    let key = key.into_owned();
                    self.index.insert(key.clone(), self.groups.len());
                    self.groups.push((key, vec![value.into_owned()]));
                }
            }
        }
    }

    fn render(&self) -> String {
        self.groups
            .iter()
            .map(|(key, values)| format!("{key}={}", values.join(",")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Cuts `body` to [`MAX_LOGGED_BODY_CHARS`] characters, marking the cut.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_LOGGED_BODY_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATED_MARKER}", &body[..cut]),
        None => body.to_owned(),
    }
}

/// Space-joined `key=v1,v2` pairs from the query string and, for
/// url-encoded form posts, the body. Keys keep first-seen order.
fn render_params(req: &Request, body: &[u8]) -> String {
    let mut params = ParamGroups::default();

    if let Some(query) = req.query() {
        params.extend(form_urlencoded::parse(query.as_bytes()));
    }
    if req.header(CONTENT_TYPE.as_str()).is_some_and(is_form_urlencoded) {
        params.extend(form_urlencoded::parse(body));
    }

    params.render()
}

/// Media types compare case-insensitively; parameters such as `charset` are
/// ignored.
fn is_form_urlencoded(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/x-www-form-urlencoded")
}
