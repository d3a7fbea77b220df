//! The seam between the transport and request processing.
//!
//! The connection loop hands every fully buffered request to a [`Handler`]
//! and writes back whatever response it returns. An `Err` becomes a bare
//! `500 Internal Server Error`.

use std::error::Error;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

pub type BoxError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, req: Request<Bytes>) -> Result<Response<Bytes>, BoxError>;
}

/// A [`Handler`] backed by an async closure, see [`make_handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Err> Handler for HandlerFn<F>
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Bytes>, Err>> + Send,
    Err: Into<BoxError>,
{
    async fn call(&self, req: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        (self.f)(req).await.map_err(Into::into)
    }
}

pub fn make_handler<F, Fut, Err>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<Bytes>) -> Fut,
    Fut: Future<Output = Result<Response<Bytes>, Err>>,
    Err: Into<BoxError>,
{
    HandlerFn { f }
}
