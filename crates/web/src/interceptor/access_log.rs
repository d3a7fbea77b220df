use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use http::{Response, StatusCode};
use tracing::info;

use super::{Interceptor, Next};
use crate::RequestContext;

/// Records one structured event per served request.
///
/// A request whose handler panicked is logged with status 500 before the
/// panic continues outwards to [`super::Recovery`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessLog;

#[async_trait]
impl Interceptor for AccessLog {
    async fn intercept(&self, req: RequestContext, next: Next<'_>) -> Response<Bytes> {
        let start = Instant::now();
        let remote_addr = req.remote_addr();
        let version = req.version();
        let method = req.method().clone();
        let uri = req.uri().clone();

        let outcome = AssertUnwindSafe(next.run(req)).catch_unwind().await;
        let status = match &outcome {
            Ok(response) => response.status(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        info!(
            ip = ?remote_addr,
            proto = ?version,
            %method,
            %uri,
            status = status.as_u16(),
            latency = ?start.elapsed(),
            "received request"
        );

        match outcome {
            Ok(response) => response,
            Err(panic) => panic::resume_unwind(panic),
        }
    }
}
