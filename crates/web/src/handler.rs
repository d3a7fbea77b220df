use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Response;

use crate::RequestContext;
use crate::responder::Responder;

/// Terminal stage of a request: produces the response for a matched route.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: RequestContext) -> Response<Bytes>;
}

/// an async fn holder without shared state, see [`handler_fn`]
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future + Send + 'static,
    Fut::Output: Responder,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future + Send + 'static,
    Fut::Output: Responder,
{
    async fn invoke(&self, req: RequestContext) -> Response<Bytes> {
        (self.f)(req).await.into_response()
    }
}

/// an async fn holder that is handed a clone of `state` on every call, see
/// [`handler_with_state`]
#[derive(Debug)]
pub struct StateFnHandler<S, F> {
    state: Arc<S>,
    f: F,
}

pub fn handler_with_state<S, F, Fut>(state: Arc<S>, f: F) -> StateFnHandler<S, F>
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, RequestContext) -> Fut + Send + Sync,
    Fut: Future + Send + 'static,
    Fut::Output: Responder,
{
    StateFnHandler { state, f }
}

#[async_trait]
impl<S, F, Fut> RequestHandler for StateFnHandler<S, F>
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, RequestContext) -> Fut + Send + Sync,
    Fut: Future + Send + 'static,
    Fut::Output: Responder,
{
    async fn invoke(&self, req: RequestContext) -> Response<Bytes> {
        (self.f)(Arc::clone(&self.state), req).await.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Request, StatusCode};

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    async fn hello(_req: RequestContext) -> &'static str {
        "hello"
    }

    struct Counter {
        base: usize,
    }

    async fn count(state: Arc<Counter>, req: RequestContext) -> (StatusCode, String) {
        (StatusCode::ACCEPTED, format!("{}", state.base + req.body().len()))
    }

    #[tokio::test]
    async fn fn_handler_invokes_function() {
        let handler = handler_fn(hello);
        assert_is_handler(&handler);

        let req = RequestContext::from(Request::new(Bytes::new()));
        let response = handler.invoke(req).await;
        assert_eq!(response.body().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn state_handler_receives_state() {
        let handler = handler_with_state(Arc::new(Counter { base: 40 }), count);
        assert_is_handler(&handler);

        let req = RequestContext::from(Request::new(Bytes::from_static(b"ab")));
        let response = handler.invoke(req).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.body().as_ref(), b"42");
    }
}
