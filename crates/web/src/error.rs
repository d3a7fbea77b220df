//! The errors a handler can end with.
//!
//! Every failure is funnelled into one [`WebError`] at the handler boundary and
//! answered with exactly one status. Server errors are logged here, the client
//! only ever sees the canonical reason phrase.

use std::error::Error;

use bytes::Bytes;
use http::{HeaderValue, Method, Response, StatusCode, header};
use thiserror::Error;
use tracing::{debug, error};

use crate::form::DecodeError;
use crate::responder::Responder;
use crate::session::SessionError;
use crate::template::RenderError;

pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("client error: {status}")]
    Client { status: StatusCode },

    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed { allowed: Vec<Method> },

    #[error("server error: {source}")]
    Server { source: BoxError },
}

impl WebError {
    pub fn client(status: StatusCode) -> Self {
        Self::Client { status }
    }

    pub fn server<E: Into<BoxError>>(source: E) -> Self {
        Self::Server { source: source.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Client { status } => *status,
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            WebError::Server { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DecodeError> for WebError {
    fn from(e: DecodeError) -> Self {
        debug!(cause = %e, "failed to decode form");
        Self::client(StatusCode::BAD_REQUEST)
    }
}

impl From<RenderError> for WebError {
    fn from(e: RenderError) -> Self {
        Self::server(e)
    }
}

impl From<SessionError> for WebError {
    fn from(e: SessionError) -> Self {
        Self::server(e)
    }
}

impl Responder for WebError {
    fn into_response(self) -> Response<Bytes> {
        let status = self.status();

        if let WebError::Server { source } = &self {
            error!(cause = %source, "server error");
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        let mut response = (status, reason.to_owned()).into_response();

        if let WebError::MethodNotAllowed { allowed } = &self {
            let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_hides_cause() {
        let response = WebError::server("database is on fire").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body().as_ref(), b"Internal Server Error");
    }

    #[test]
    fn method_not_allowed_lists_methods() {
        let response = WebError::MethodNotAllowed { allowed: vec![Method::GET, Method::POST] }.into_response();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");
    }

    #[test]
    fn decode_error_is_bad_request() {
        let error = WebError::from(DecodeError::InvalidValue { field: "expires", reason: "not a number".into() });
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }
}
