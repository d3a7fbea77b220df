use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use http::{HeaderValue, Response, header};
use tracing::error;

use super::{Interceptor, Next};
use crate::error::WebError;
use crate::session::SessionManager;
use crate::{RequestContext, Responder};

/// Loads the client's session before the handler runs and saves it afterwards.
///
/// The save also happens when the handler panics; the panic then continues
/// outwards to [`super::Recovery`].
#[derive(Debug, Clone)]
pub struct SessionAttach {
    manager: Arc<SessionManager>,
}

impl SessionAttach {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Interceptor for SessionAttach {
    async fn intercept(&self, mut req: RequestContext, next: Next<'_>) -> Response<Bytes> {
        let session = match self.manager.load(req.headers()).await {
            Ok(session) => session,
            Err(e) => return WebError::from(e).into_response(),
        };
        req.set_session(session.clone());

        let outcome = AssertUnwindSafe(next.run(req)).catch_unwind().await;
        let saved = self.manager.save(&session).await;

        let mut response = match outcome {
            Ok(response) => response,
            Err(panic) => {
                if let Err(e) = saved {
                    error!(cause = %e, "failed to save session of a panicked request");
                }
                panic::resume_unwind(panic);
            }
        };

        match saved {
            Ok(cookie) => {
                let headers = response.headers_mut();
                headers.append(header::VARY, HeaderValue::from_static("Cookie"));
                if let Some(cookie) = cookie {
                    headers.append(header::SET_COOKIE, cookie);
                    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(r#"no-cache="Set-Cookie""#));
                }
                response
            }
            Err(e) => WebError::from(e).into_response(),
        }
    }
}
