//! Request head handling.
//!
//! [`RequestHeader`] wraps an `http::Request<()>` so the decoder can hand the
//! connection loop a typed head before the body has arrived.

use std::net::SocketAddr;

use http::{HeaderMap, Method, Request, Uri, Version, header};

/// A parsed request line plus headers, without a body attached yet.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl RequestHeader {
    /// Attaches a body, turning the head into a complete request.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|()| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether the client allows the connection to be reused after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive unless `Connection: close` is sent,
    /// HTTP/1.0 defaults to close unless `Connection: keep-alive` is sent.
    pub fn keep_alive(&self) -> bool {
        let connection = self.headers().get(header::CONNECTION).and_then(|value| value.to_str().ok());
        let has_token = |token: &str| {
            connection.is_some_and(|value| value.split(',').any(|part| part.trim().eq_ignore_ascii_case(token)))
        };

        match self.version() {
            Version::HTTP_10 => has_token("keep-alive"),
            _ => !has_token("close"),
        }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

/// Facts about the underlying connection, inserted into every request's
/// extensions by the connection loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionInfo {
    remote_addr: Option<SocketAddr>,
}

impl ConnectionInfo {
    pub fn new(remote_addr: Option<SocketAddr>) -> Self {
        Self { remote_addr }
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}
