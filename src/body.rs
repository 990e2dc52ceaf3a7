//! Request bodies that can be read more than once.
//!
//! A hyper body is a stream: once a frame is polled out of it, it is gone.
//! The logging middleware needs the bytes *and* the handler needs the bytes,
//! so the stream is drained exactly once into a [`Bytes`] buffer and every
//! reader after that gets its own cursor over the same allocation.
//!
//! ```text
//! Pending(stream, buf) ──capture()──▶ Captured(bytes) ──open_reader()──▶ BodyReader
//!                                           │                    (any number of times)
//!                                           └──capture()──▶ Ok(bytes)   (no-op)
//! ```
//!
//! Frames are appended to `buf` as they arrive and the stream stays in place
//! until it ends, so a `capture()` that is cancelled halfway (a timeout, a
//! dropped request future) can be resumed by the next call without losing
//! data. `Bytes` clones are reference-counted, so handing out readers never
//! copies the body.

use std::io::{self, Cursor, Read};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::{BoxError, Error};

/// A request body that is drained at most once and replayed from memory.
pub struct ReplayableBody {
    state: State,
}

enum State {
    Pending { body: UnsyncBoxBody<Bytes, BoxError>, buf: BytesMut },
    Captured(Bytes),
}

impl ReplayableBody {
    /// Wraps any `http_body::Body` yielding [`Bytes`] frames.
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            state: State::Pending { body: body.map_err(Into::into).boxed_unsync(), buf: BytesMut::new() },
        }
    }

    /// Drains the underlying stream into memory and returns the bytes.
    ///
    /// Only the first completed call touches the stream; later calls return
    /// the buffer it produced. Cancelling a call keeps every frame read so far
    /// and the next call picks up where it stopped. If the stream fails, the
    /// body is left captured-and-empty so that downstream readers see an
    /// empty body instead of a half-consumed stream, and
    /// [`Error::CaptureFailed`] is returned.
    pub async fn capture(&mut self) -> Result<Bytes, Error> {
        loop {
            let (body, buf) = match &mut self.state {
                State::Captured(bytes) => return Ok(bytes.clone()),
                State::Pending { body, buf } => (body, buf),
            };

            match body.frame().await {
                Some(Ok(frame)) => {
                    // Trailers carry no payload.
                    if let Ok(data) = frame.into_data() {
                        buf.extend_from_slice(&data);
                    }
                }
                Some(Err(e)) => {
                    self.state = State::Captured(Bytes::new());
                    return Err(Error::CaptureFailed(e));
                }
                None => {
                    let bytes = std::mem::take(buf).freeze();
                    self.state = State::Captured(bytes.clone());
                    return Ok(bytes);
                }
            }
        }
    }

    pub fn is_captured(&self) -> bool {
        matches!(self.state, State::Captured(_))
    }

    /// Returns a fresh cursor positioned at the start of the captured bytes.
    ///
    /// Readers are independent: advancing one does not move any other.
    pub fn open_reader(&self) -> Result<BodyReader, Error> {
        match &self.state {
            State::Captured(bytes) => Ok(BodyReader(Cursor::new(bytes.clone()))),
            State::Pending { .. } => Err(Error::BodyNotCaptured),
        }
    }
}

impl Default for ReplayableBody {
    fn default() -> Self {
        Self::new(Empty::<Bytes>::new())
    }
}

impl std::fmt::Debug for ReplayableBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            State::Pending { buf, .. } => write!(f, "ReplayableBody::Pending({} bytes read)", buf.len()),
            State::Captured(bytes) => write!(f, "ReplayableBody::Captured({} bytes)", bytes.len()),
        }
    }
}

/// Independent read view over a captured body.
///
/// Implements both [`std::io::Read`] and [`tokio::io::AsyncRead`].
#[derive(Debug, Clone)]
pub struct BodyReader(Cursor<Bytes>);

impl BodyReader {
    /// Number of bytes not yet read through this reader.
    pub fn remaining(&self) -> usize {
        let len = self.0.get_ref().len() as u64;
        len.saturating_sub(self.0.position()) as usize
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl AsyncRead for BodyReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}
