//! Per-request trace context.
//!
//! [`RequestContextResolver`] turns an inbound request into a
//! [`RequestContext`]: the trace id, the upstream correlation id, and the
//! authenticated username when one is available. The logging middleware then
//! publishes that context in a task-local slot for the lifetime of the
//! downstream call, so nested code can ask for it with [`current`] instead of
//! threading it through every signature.
//!
//! The slot is scoped to the request's future. It is gone once the future
//! completes, unwinds, or is dropped, and tasks spawned from inside a handler
//! do not inherit it.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::trace;
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::error::BoxError;
use crate::request::Request;

/// Inbound header carrying a caller-supplied trace id. Also set on every
/// logged response.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Inbound header carrying an upstream correlation id. Passed through, never
/// generated.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Identity of one inbound request, as seen by the logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    trace_id: String,
    correlation_id: Option<String>,
    username: Option<String>,
}

impl RequestContext {
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// Returns the context of the request currently being handled, if any.
pub fn current() -> Option<RequestContext> {
    CURRENT.try_with(Clone::clone).ok()
}

/// Shorthand for `current().map(|c| c.trace_id().to_owned())`.
pub fn current_trace_id() -> Option<String> {
    CURRENT.try_with(|ctx| ctx.trace_id.clone()).ok()
}

/// Runs `fut` with `ctx` published as the current request context.
pub(crate) async fn scope<F: Future>(ctx: RequestContext, fut: F) -> F::Output {
    CURRENT.scope(ctx, fut).await
}

// ── Principal lookup ──────────────────────────────────────────────────────────

/// The authenticated identity behind a request, as reported by the host's
/// authentication layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub authenticated: bool,
    pub anonymous: bool,
    pub name: String,
}

impl Principal {
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self { authenticated: true, anonymous: false, name: name.into() }
    }

    pub fn anonymous() -> Self {
        Self { authenticated: true, anonymous: true, name: "anonymousUser".to_owned() }
    }
}

/// Resolves the principal for a request. Implemented by the host.
///
/// `Ok(None)` means no principal is attached. An `Err` means the lookup could
/// not run at all (no security context configured, backing store down, ...).
/// Both are treated as "no user" by the resolver, and so is a lookup that
/// panics.
pub trait PrincipalLookup: Send + Sync + 'static {
    fn principal(&self, req: &Request) -> Result<Option<Principal>, BoxError>;
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Builds a [`RequestContext`] from request headers and the optional
/// principal lookup.
#[derive(Clone, Default)]
pub struct RequestContextResolver {
    lookup: Option<Arc<dyn PrincipalLookup>>,
}

impl RequestContextResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal_lookup(lookup: Arc<dyn PrincipalLookup>) -> Self {
        Self { lookup: Some(lookup) }
    }

    pub fn resolve(&self, req: &Request, config: &LoggingConfig) -> RequestContext {
        let trace_id = match req.header(TRACE_ID_HEADER) {
            Some(id) if !id.trim().is_empty() => id.to_owned(),
            _ => Uuid::new_v4().to_string(),
        };

        let correlation_id = req.header(CORRELATION_ID_HEADER).map(str::to_owned);

        let username = if config.include_user { self.username(req) } else { None };

        RequestContext { trace_id, correlation_id, username }
    }

    fn username(&self, req: &Request) -> Option<String> {
        let lookup = self.lookup.as_ref()?;
        match panic::catch_unwind(AssertUnwindSafe(|| lookup.principal(req))) {
            Ok(Ok(Some(p))) if p.authenticated && !p.anonymous => Some(p.name),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                trace!("could not extract user information: {e}");
                None
            }
            Err(_) => {
                trace!("could not extract user information: principal lookup panicked");
                None
            }
        }
    }
}

impl std::fmt::Debug for RequestContextResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContextResolver")
            .field("principal_lookup", &self.lookup.is_some())
            .finish()
    }
}
