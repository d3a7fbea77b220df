//! The single entry point from the transport into the application.
//!
//! Every request goes through the outer chain; the router is its terminal
//! stage. A matched application route is then run through the dynamic chain,
//! a static route is invoked directly, and a miss is answered with `404` or
//! `405` without touching either.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use snippetbox_http::handler::{BoxError, Handler};

use crate::error::WebError;
use crate::handler::RequestHandler;
use crate::interceptor::Interceptors;
use crate::router::{RouteKind, RouteMatch, Router};
use crate::{RequestContext, Responder};

#[derive(Debug)]
pub struct Pipeline {
    outer: Interceptors,
    dynamic: Interceptors,
    router: Router,
}

impl Pipeline {
    pub fn new(router: Router, outer: Interceptors, dynamic: Interceptors) -> Self {
        Self { outer, dynamic, router }
    }

    pub async fn serve(&self, req: Request<Bytes>) -> Response<Bytes> {
        let dispatch = Dispatch { router: &self.router, dynamic: &self.dynamic };
        self.outer.run(RequestContext::from(req), &dispatch).await
    }
}

#[async_trait]
impl Handler for Pipeline {
    async fn call(&self, req: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        Ok(self.serve(req).await)
    }
}

/// Terminal stage of the outer chain.
struct Dispatch<'a> {
    router: &'a Router,
    dynamic: &'a Interceptors,
}

#[async_trait]
impl RequestHandler for Dispatch<'_> {
    async fn invoke(&self, mut req: RequestContext) -> Response<Bytes> {
        match self.router.at(req.method(), req.uri().path()) {
            RouteMatch::Found { handler, kind, params } => {
                req.set_path_params(params);
                match kind {
                    RouteKind::Application => self.dynamic.run(req, handler).await,
                    RouteKind::Static => handler.invoke(req).await,
                }
            }
            RouteMatch::MethodNotAllowed { allowed } => WebError::MethodNotAllowed { allowed }.into_response(),
            RouteMatch::NotFound => WebError::NotFound.into_response(),
        }
    }
}
