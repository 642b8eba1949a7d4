//! The response sink.
//!
//! Handlers never build a hyper response themselves. They are handed a
//! [`ResponseWriter`] and push a status, headers, and body bytes into it.
//! At the transport boundary the sink is a [`ResponseBuffer`]; anywhere in
//! between it may be a decorator that watches what flows through (see
//! [`StatusRecorder`](crate::middleware::StatusRecorder)).

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::debug;

/// Write side of an HTTP response.
///
/// The status is committed once: by the first [`write_header`] call, or
/// implicitly as `200 OK` by the first [`write`]. What happens to a second
/// status is up to the implementation; the transport sink ignores it.
///
/// [`write_header`]: ResponseWriter::write_header
/// [`write`]: ResponseWriter::write
pub trait ResponseWriter: Send {
    /// Headers to be sent with the response.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sets the response status.
    fn write_header(&mut self, status: StatusCode);

    /// Appends bytes to the response body.
    fn write(&mut self, chunk: &[u8]);
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        (**self).write_header(status);
    }

    fn write(&mut self, chunk: &[u8]) {
        (**self).write(chunk);
    }
}

/// Transport-level sink: buffers the whole response in memory and hands it
/// to hyper once the pipeline is done.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Finishes the response. A sink nobody wrote to answers `200 OK` with
    /// an empty body.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for ResponseBuffer {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        match self.status {
            Some(committed) => {
                debug!(%committed, ignored = %status, "superfluous write_header call");
            }
            None => self.status = Some(status),
        }
    }

    fn write(&mut self, chunk: &[u8]) {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(chunk);
    }
}
