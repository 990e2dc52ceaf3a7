//! Health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? |
//!
//! Probes fire every few seconds, so their request lines are noise. The
//! default [`LoggingConfig`](crate::LoggingConfig) excludes `/health`, which
//! covers `/healthz`; add `/readyz` to `exclude-paths` if you route it too.
//!
//! ```rust,no_run
//! use reqtrail::{Router, health};
//!
//! let app = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```

use crate::{Request, Response};

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"`. Replace it when readiness depends on
/// downstream services.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
