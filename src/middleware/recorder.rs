//! Status-capturing decorator over a [`ResponseWriter`].

use http::{HeaderMap, StatusCode};

use crate::writer::ResponseWriter;

/// Forwards everything to the wrapped sink and remembers the status that
/// was committed, so the layer that installed it can read it afterwards.
///
/// Starts out at `200 OK`, the status a handler gets when it writes a body
/// without choosing one. Only the first commit is recorded: an explicit
/// [`write_header`](ResponseWriter::write_header), or the implicit `200`
/// of a first body [`write`](ResponseWriter::write). Later status calls are
/// still forwarded untouched.
pub struct StatusRecorder<W> {
    inner: W,
    status: StatusCode,
    committed: bool,
}

impl<W: ResponseWriter> StatusRecorder<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, status: StatusCode::OK, committed: false }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the wrapped handler has committed a status yet.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: ResponseWriter> ResponseWriter for StatusRecorder<W> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        if !self.committed {
            self.status = status;
            self.committed = true;
        }
        self.inner.write_header(status);
    }

    fn write(&mut self, chunk: &[u8]) {
        self.committed = true;
        self.inner.write(chunk);
    }
}
