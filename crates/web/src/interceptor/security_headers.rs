use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderName, HeaderValue, Response, header};

use super::{Interceptor, Next};
use crate::RequestContext;

const HEADERS: [(HeaderName, &str); 5] = [
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
    ),
    (header::REFERRER_POLICY, "origin-when-cross-origin"),
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "deny"),
    (header::X_XSS_PROTECTION, "0"),
];

/// Sets the browser hardening headers on every response.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityHeaders;

#[async_trait]
impl Interceptor for SecurityHeaders {
    async fn intercept(&self, req: RequestContext, next: Next<'_>) -> Response<Bytes> {
        let mut response = next.run(req).await;

        let headers = response.headers_mut();
        for (name, value) in HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use crate::interceptor::Interceptors;
    use http::Request;

    #[tokio::test]
    async fn sets_all_headers() {
        let chain = Interceptors::builder().add_last(SecurityHeaders).build();
        let endpoint = handler_fn(|_req| async { "page" });

        let response = chain.run(RequestContext::from(Request::new(Bytes::new())), &endpoint).await;
        let headers = response.headers();

        assert_eq!(
            headers[header::CONTENT_SECURITY_POLICY],
            "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com"
        );
        assert_eq!(headers[header::REFERRER_POLICY], "origin-when-cross-origin");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "deny");
        assert_eq!(headers[header::X_XSS_PROTECTION], "0");
    }
}
