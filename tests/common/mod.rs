//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::Full;
use reqtrail::{BoxError, Principal, PrincipalLookup, Request};
use tracing_subscriber::fmt::MakeWriter;

/// Log sink that keeps everything written to it.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn lines(&self) -> Vec<String> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).lines().map(str::to_owned).collect()
    }

    /// Lines whose message contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.lines().into_iter().filter(|l| l.contains(needle)).collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Installs a capturing subscriber for the current thread.
///
/// Works with `#[tokio::test]`'s default current-thread runtime: every task
/// runs on the test thread, so every event reaches the sink.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

pub fn peer() -> SocketAddr {
    "198.51.100.20:40000".parse().unwrap()
}

/// Builds a request with the given headers and body.
pub fn request(method: &str, uri: &str, headers: &[(&str, &str)], body: &str) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let req = builder.body(Full::new(Bytes::from(body.to_owned()))).unwrap();
    Request::new(req, peer())
}

/// Principal from an `x-user` header. `x-user: !` simulates a lookup that
/// cannot run; `x-user: anonymous` an anonymous principal.
pub struct HeaderPrincipal;

impl PrincipalLookup for HeaderPrincipal {
    fn principal(&self, req: &Request) -> Result<Option<Principal>, BoxError> {
        match req.header("x-user") {
            Some("!") => Err("security context not configured".into()),
            Some("anonymous") => Ok(Some(Principal::anonymous())),
            Some(name) => Ok(Some(Principal::authenticated(name))),
            None => Ok(None),
        }
    }
}

/// A body whose stream fails on first poll.
pub struct FailingBody;

impl http_body::Body for FailingBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Result<http_body::Frame<Bytes>, io::Error>>> {
        std::task::Poll::Ready(Some(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "client went away"))))
    }
}
