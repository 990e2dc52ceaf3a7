//! Client address resolution behind proxies.
//!
//! Probes forwarding headers in a fixed order; the first header with a usable
//! value wins, even when a later one looks more specific. Comma-separated
//! lists (`X-Forwarded-For: client, proxy1, proxy2`) contribute their first
//! entry.

use std::net::SocketAddr;

use http::HeaderMap;

/// Forwarding headers, in probe order.
pub const FORWARDING_HEADERS: [&str; 6] = [
    "x-forwarded-for",
    "x-real-ip",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http_client_ip",
    "http_x_forwarded_for",
];

/// Returns the originating client IP for a request, falling back to the
/// peer address of the connection.
pub fn resolve(headers: &HeaderMap, remote_addr: SocketAddr) -> String {
    FORWARDING_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name)?.to_str().ok())
        .find(|value| !value.is_empty() && !value.eq_ignore_ascii_case("unknown"))
        .map(|value| value.split(',').next().unwrap_or_default().trim().to_owned())
        .unwrap_or_else(|| remote_addr.ip().to_string())
}
