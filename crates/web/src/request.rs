//! Request handling module that provides access to HTTP request information and path parameters.
//!
//! - `RequestContext`: the owned request head and body, the matched path
//!   parameters and the session attached by the dynamic chain
//! - `PathParams`: named segments captured by the router

use std::net::SocketAddr;

use bytes::Bytes;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Request, Uri, Version, header};
use snippetbox_http::protocol::ConnectionInfo;

use crate::form::{DecodeError, FormSpec};
use crate::session::Session;

/// Everything a handler knows about the request it serves.
///
/// A context is created once per request at dispatch time and moved through
/// the interceptor chains into the handler. Only the pipeline fills in path
/// parameters and the session.
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    body: Bytes,
    path_params: PathParams,
    session: Option<Session>,
}

impl RequestContext {
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self { parts, body, path_params: PathParams::empty(), session: None }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn version(&self) -> Version {
        self.parts.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The peer address recorded by the connection loop, if any.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.parts.extensions.get::<ConnectionInfo>().and_then(ConnectionInfo::remote_addr)
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// The session attached by the dynamic chain, absent on static routes.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Decodes the submitted form body according to `spec`.
    pub fn form<T: Default>(&self, spec: &FormSpec<T>) -> Result<T, DecodeError> {
        spec.decode_body(self.parts.headers.get(header::CONTENT_TYPE), &self.body)
    }

    pub(crate) fn set_path_params(&mut self, path_params: PathParams) {
        self.path_params = path_params;
    }

    pub(crate) fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }
}

impl From<Request<Bytes>> for RequestContext {
    fn from(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts, body)
    }
}

/// Path parameters captured from the URL, in pattern order.
///
/// For the pattern `/snippet/view/:id`, the path `/snippet/view/7` yields the
/// single parameter `id = "7"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: Vec<(String, String)>,
}

impl PathParams {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.inner.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_addr_comes_from_connection_info() {
        let addr: SocketAddr = "10.0.0.1:9999".parse().unwrap();
        let mut request = Request::builder().uri("/").body(Bytes::new()).unwrap();
        request.extensions_mut().insert(ConnectionInfo::new(Some(addr)));

        let ctx = RequestContext::from(request);
        assert_eq!(ctx.remote_addr(), Some(addr));
        assert!(ctx.session().is_none());
        assert!(ctx.path_params().is_empty());
    }

    #[test]
    fn path_params_lookup() {
        let mut params = PathParams::empty();
        params.push("id", "42");

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("missing"), None);
    }
}
