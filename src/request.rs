//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use http_body::Body;

use crate::body::{BodyReader, ReplayableBody};
use crate::error::{BoxError, Error};

/// An incoming HTTP request.
///
/// The body starts out as the raw stream from the connection. The first call
/// to [`bytes`](Request::bytes) (or a middleware calling
/// [`ReplayableBody::capture`]) drains it; every read after that is served
/// from memory.
pub struct Request {
    parts: Parts,
    body: ReplayableBody,
    params: HashMap<String, String>,
    remote_addr: SocketAddr,
}

impl Request {
    /// Wraps an `http::Request` received from `remote_addr`.
    pub fn new<B>(req: http::Request<B>, remote_addr: SocketAddr) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        Self {
            parts,
            body: ReplayableBody::new(body),
            params: HashMap::new(),
            remote_addr,
        }
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn query(&self) -> Option<&str> { self.parts.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }

    /// Transport-layer peer address of the connection.
    pub fn remote_addr(&self) -> SocketAddr { self.remote_addr }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn body_mut(&mut self) -> &mut ReplayableBody {
        &mut self.body
    }

    /// The full request body. Drains the stream on first use.
    pub async fn bytes(&mut self) -> Result<Bytes, Error> {
        self.body.capture().await
    }

    /// A fresh reader over the body. Fails if nothing has captured it yet.
    pub fn body_reader(&self) -> Result<BodyReader, Error> {
        self.body.open_reader()
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("remote_addr", &self.remote_addr)
            .field("body", &self.body)
            .finish()
    }
}
