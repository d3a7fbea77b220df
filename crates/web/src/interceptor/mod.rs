//! Ordered request interceptors.
//!
//! An [`Interceptor`] wraps everything behind it: it receives the request
//! together with a [`Next`] continuation and decides whether and when to call
//! it and what to do with the response. The first interceptor of a chain is
//! the outermost one.

mod access_log;
mod recovery;
mod security_headers;
mod session_attach;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Response;

use crate::RequestContext;
use crate::handler::RequestHandler;

pub use access_log::AccessLog;
pub use recovery::Recovery;
pub use security_headers::SecurityHeaders;
pub use session_attach::SessionAttach;

#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, req: RequestContext, next: Next<'_>) -> Response<Bytes>;
}

/// The rest of a chain, ending in a terminal handler.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Interceptor>],
    endpoint: &'a dyn RequestHandler,
}

impl Next<'_> {
    pub async fn run(self, req: RequestContext) -> Response<Bytes> {
        match self.rest.split_first() {
            Some((first, rest)) => first.intercept(req, Next { rest, endpoint: self.endpoint }).await,
            None => self.endpoint.invoke(req).await,
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("remaining", &self.rest.len()).finish_non_exhaustive()
    }
}

/// A composed chain of interceptors.
#[derive(Clone, Default)]
pub struct Interceptors {
    inner: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors").field("len", &self.inner.len()).finish()
    }
}

impl Interceptors {
    pub fn builder() -> InterceptorsBuilder {
        InterceptorsBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Runs `req` through the whole chain and into `endpoint`.
    pub async fn run(&self, req: RequestContext, endpoint: &dyn RequestHandler) -> Response<Bytes> {
        Next { rest: &self.inner, endpoint }.run(req).await
    }
}

#[derive(Default)]
pub struct InterceptorsBuilder {
    inner: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for InterceptorsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorsBuilder").field("len", &self.inner.len()).finish()
    }
}

impl InterceptorsBuilder {
    fn new() -> Self {
        Self { inner: vec![] }
    }

    /// Appends an interceptor, innermost so far.
    #[must_use]
    pub fn add_last<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.inner.push(Arc::new(interceptor));
        self
    }

    /// Prepends an interceptor, outermost so far.
    #[must_use]
    pub fn add_first<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.inner.insert(0, Arc::new(interceptor));
        self
    }

    pub fn build(self) -> Interceptors {
        Interceptors { inner: self.inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use http::{HeaderValue, Request};
    use parking_lot::Mutex;

    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Interceptor for Trace {
        async fn intercept(&self, req: RequestContext, next: Next<'_>) -> Response<Bytes> {
            self.log.lock().push(format!("enter {}", self.name));
            let mut response = next.run(req).await;
            response.headers_mut().append("x-trace", HeaderValue::from_static(self.name));
            self.log.lock().push(format!("leave {}", self.name));
            response
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl Interceptor for ShortCircuit {
        async fn intercept(&self, _req: RequestContext, _next: Next<'_>) -> Response<Bytes> {
            Response::new(Bytes::from_static(b"stopped"))
        }
    }

    fn request() -> RequestContext {
        RequestContext::from(Request::new(Bytes::new()))
    }

    #[tokio::test]
    async fn first_interceptor_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Interceptors::builder()
            .add_last(Trace { name: "b", log: Arc::clone(&log) })
            .add_last(Trace { name: "c", log: Arc::clone(&log) })
            .add_first(Trace { name: "a", log: Arc::clone(&log) })
            .build();

        let endpoint = handler_fn(|_req| async { "done" });
        let response = chain.run(request(), &endpoint).await;

        assert_eq!(response.body().as_ref(), b"done");
        assert_eq!(*log.lock(), vec!["enter a", "enter b", "enter c", "leave c", "leave b", "leave a"]);
        let traces = response.headers().get_all("x-trace").iter().collect::<Vec<_>>();
        assert_eq!(traces, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn interceptor_may_skip_the_rest() {
        let chain = Interceptors::builder().add_last(ShortCircuit).build();
        let endpoint = handler_fn(|_req| async { "unreachable" });

        let response = chain.run(request(), &endpoint).await;
        assert_eq!(response.body().as_ref(), b"stopped");
    }
}
