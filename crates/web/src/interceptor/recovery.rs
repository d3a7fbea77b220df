use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use http::{HeaderValue, Response, header};
use tracing::error;

use super::{Interceptor, Next};
use crate::error::WebError;
use crate::{RequestContext, Responder};

/// Turns a panic anywhere further down the chain into a `500` that closes the
/// connection. The fault is logged and never reaches the serving loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct Recovery;

#[async_trait]
impl Interceptor for Recovery {
    async fn intercept(&self, req: RequestContext, next: Next<'_>) -> Response<Bytes> {
        let method = req.method().clone();
        let uri = req.uri().clone();

        match AssertUnwindSafe(next.run(req)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                error!(%method, %uri, cause = panic_message(panic.as_ref()), "request handler panicked");

                let mut response = WebError::server("request handler panicked").into_response();
                response.headers_mut().insert(header::CONNECTION, HeaderValue::from_static("close"));
                response
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
