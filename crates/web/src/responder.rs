//! Response handling module that converts handler results into HTTP responses.
//!
//! The [`Responder`] trait is the last step of every handler: whatever the
//! handler returns is turned into a `Response<Bytes>` here.

use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode, header};

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn into_response(self) -> Response<Bytes>;
}

impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn into_response(self) -> Response<Bytes> {
        match self {
            Ok(t) => t.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

impl Responder for Response<Bytes> {
    fn into_response(self) -> Response<Bytes> {
        self
    }
}

/// Sets the status of the wrapped responder.
impl<T: Responder> Responder for (StatusCode, T) {
    fn into_response(self) -> Response<Bytes> {
        let (status, responder) = self;
        let mut response = responder.into_response();
        *response.status_mut() = status;
        response
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Response<Bytes> {
        text(Bytes::from_static(self.as_bytes()))
    }
}

impl Responder for String {
    fn into_response(self) -> Response<Bytes> {
        text(Bytes::from(self))
    }
}

fn text(body: Bytes) -> Response<Bytes> {
    with_content_type(body, HeaderValue::from_static("text/plain; charset=utf-8"))
}

/// A `200 OK` response carrying a rendered HTML page.
pub fn html(body: impl Into<Bytes>) -> Response<Bytes> {
    with_content_type(body.into(), HeaderValue::from_static("text/html; charset=utf-8"))
}

/// A `303 See Other` pointing at `location`.
///
/// An unrepresentable location falls back to `/`.
pub fn redirect(location: &str) -> Response<Bytes> {
    let location = HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"));

    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::SEE_OTHER;
    response.headers_mut().insert(header::LOCATION, location);
    response
}

fn with_content_type(body: Bytes, content_type: HeaderValue) -> Response<Bytes> {
    let mut response = Response::new(body);
    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    response
}
