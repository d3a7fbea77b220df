//! Method and path routing.
//!
//! Patterns are made of `/`-separated segments: static text, named captures
//! (`:id`) that match one non-empty segment, and a single trailing wildcard
//! (`*filepath`) that captures the rest of the path. When several patterns
//! match a path the most specific one wins: at the first position where two
//! patterns differ, static beats named and named beats wildcard.
//!
//! Segments are percent-decoded before matching, after the path has been split
//! on `/`. A malformed escape or an escape that does not decode to UTF-8 never
//! matches any route.
//!
//! ```
//! use snippetbox_web::router::{Router, RouteMatch, get};
//! use snippetbox_web::handler_fn;
//!
//! let router = Router::builder()
//!     .route("/snippet/view/:id", get(handler_fn(|_req| async { "snippet" })))
//!     .build()
//!     .unwrap();
//!
//! match router.at(&http::Method::GET, "/snippet/view/7") {
//!     RouteMatch::Found { params, .. } => assert_eq!(params.get("id"), Some("7")),
//!     _ => unreachable!(),
//! }
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

use http::Method;
use thiserror::Error;

use crate::PathParams;
use crate::handler::RequestHandler;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("route {method} {pattern} is registered twice")]
    DuplicateRoute { method: Method, pattern: String },

    #[error("wildcard must be the last segment of {pattern}")]
    MisplacedWildcard { pattern: String },

    #[error("invalid pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },
}

/// Whether a matched route runs inside the dynamic chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Application,
    Static,
}

/// Outcome of [`Router::at`].
pub enum RouteMatch<'router> {
    Found { handler: &'router dyn RequestHandler, kind: RouteKind, params: PathParams },
    /// The path is known, but not under the requested method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

impl std::fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteMatch::Found { kind, params, .. } => {
                f.debug_struct("Found").field("kind", kind).field("params", params).finish_non_exhaustive()
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                f.debug_struct("MethodNotAllowed").field("allowed", allowed).finish()
            }
            RouteMatch::NotFound => f.write_str("NotFound"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Wildcard(String),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Segment::Static(_) => 0,
            Segment::Param(_) => 1,
            Segment::Wildcard(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    fn parse(raw: &str) -> Result<Self, RouterError> {
        let invalid = |reason| RouterError::InvalidPattern { pattern: raw.to_owned(), reason };

        let Some(rest) = raw.strip_prefix('/') else {
            return Err(invalid("pattern must start with '/'"));
        };

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for part in rest.split('/') {
                if segments.last().is_some_and(|last| matches!(last, Segment::Wildcard(_))) {
                    return Err(RouterError::MisplacedWildcard { pattern: raw.to_owned() });
                }

                let segment = if let Some(name) = part.strip_prefix(':') {
                    Segment::Param(name.to_owned())
                } else if let Some(name) = part.strip_prefix('*') {
                    Segment::Wildcard(name.to_owned())
                } else {
                    Segment::Static(part.to_owned())
                };

                if let Segment::Param(name) | Segment::Wildcard(name) = &segment {
                    if name.is_empty() {
                        return Err(invalid("capture without a name"));
                    }
                    if segments.iter().any(|s| matches!(s, Segment::Param(n) | Segment::Wildcard(n) if n == name)) {
                        return Err(invalid("capture name used twice"));
                    }
                }

                segments.push(segment);
            }
        }

        Ok(Self { raw: raw.to_owned(), segments })
    }

    fn matches(&self, path: &[Cow<'_, str>]) -> Option<PathParams> {
        let mut params = PathParams::empty();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard(name) => {
                    params.push(name.as_str(), path.get(index..).unwrap_or_default().join("/"));
                    return Some(params);
                }
                Segment::Static(text) => {
                    if path.get(index).is_none_or(|segment| segment != text) {
                        return None;
                    }
                }
                Segment::Param(name) => match path.get(index) {
                    Some(value) if !value.is_empty() => params.push(name.as_str(), &**value),
                    _ => return None,
                },
            }
        }

        (path.len() == self.segments.len()).then_some(params)
    }

    /// Two patterns overlap completely when they only differ in capture names.
    fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|pair| match pair {
                (Segment::Static(a), Segment::Static(b)) => a == b,
                (Segment::Param(_), Segment::Param(_)) | (Segment::Wildcard(_), Segment::Wildcard(_)) => true,
                _ => false,
            })
    }

    fn specificity(&self, other: &Self) -> Ordering {
        let ranks = |pattern: &Self| pattern.segments.iter().map(Segment::rank).collect::<Vec<_>>();
        ranks(self).cmp(&ranks(other))
    }
}

struct Route {
    method: Method,
    pattern: Pattern,
    kind: RouteKind,
    handler: Arc<dyn RequestHandler>,
}

/// Main router structure that handles HTTP request routing
pub struct Router {
    // most specific pattern first
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.routes.iter().map(|route| (&route.method, &route.pattern.raw))).finish()
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Finds the handler for `method` and `path`.
    ///
    /// `HEAD` falls back to a `GET` route when no `HEAD` route is registered.
    pub fn at(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let Some(segments) = split_path(path) else {
            return RouteMatch::NotFound;
        };
        let mut allowed = Vec::new();
        let mut get_fallback = None;

        for route in &self.routes {
            let Some(params) = route.pattern.matches(&segments) else {
                continue;
            };

            if route.method == *method {
                return RouteMatch::Found { handler: route.handler.as_ref(), kind: route.kind, params };
            }

            if *method == Method::HEAD && route.method == Method::GET && get_fallback.is_none() {
                get_fallback = Some((route, params));
            } else if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }

        if let Some((route, params)) = get_fallback {
            return RouteMatch::Found { handler: route.handler.as_ref(), kind: route.kind, params };
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            RouteMatch::MethodNotAllowed { allowed }
        }
    }
}

fn split_path(path: &str) -> Option<Vec<Cow<'_, str>>> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    if rest.is_empty() { Some(Vec::new()) } else { rest.split('/').map(percent_decode).collect() }
}

fn percent_decode(segment: &str) -> Option<Cow<'_, str>> {
    if !segment.contains('%') {
        return Some(Cow::Borrowed(segment));
    }

    let mut decoded = Vec::with_capacity(segment.len());
    let mut bytes = segment.bytes();
    while let Some(byte) = bytes.next() {
        if byte == b'%' {
            let high = bytes.next().and_then(|b| char::from(b).to_digit(16))?;
            let low = bytes.next().and_then(|b| char::from(b).to_digit(16))?;
            decoded.push(u8::try_from((high << 4) | low).ok()?);
        } else {
            decoded.push(byte);
        }
    }

    String::from_utf8(decoded).ok().map(Cow::Owned)
}

/// Handlers registered for one pattern, keyed by method.
#[derive(Default)]
pub struct MethodRoute {
    handlers: Vec<(Method, Arc<dyn RequestHandler>)>,
}

impl std::fmt::Debug for MethodRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.iter().map(|(method, _)| method)).finish()
    }
}

macro_rules! method_route {
    ($($method:ident => $constant:ident),* $(,)?) => {
        $(
            pub fn $method<H: RequestHandler + 'static>(handler: H) -> MethodRoute {
                MethodRoute::default().on(Method::$constant, handler)
            }
        )*

        impl MethodRoute {
            $(
                #[must_use]
                pub fn $method<H: RequestHandler + 'static>(self, handler: H) -> Self {
                    self.on(Method::$constant, handler)
                }
            )*
        }
    };
}

method_route! {
    get => GET,
    post => POST,
    put => PUT,
    delete => DELETE,
    head => HEAD,
    options => OPTIONS,
    patch => PATCH,
}

impl MethodRoute {
    #[must_use]
    pub fn on<H: RequestHandler + 'static>(mut self, method: Method, handler: H) -> Self {
        self.handlers.push((method, Arc::new(handler)));
        self
    }
}

#[derive(Debug, Default)]
pub struct RouterBuilder {
    entries: Vec<(String, RouteKind, MethodRoute)>,
}

impl RouterBuilder {
    /// Registers an application route, dispatched through the dynamic chain.
    #[must_use]
    pub fn route(mut self, pattern: impl Into<String>, method_route: MethodRoute) -> Self {
        self.entries.push((pattern.into(), RouteKind::Application, method_route));
        self
    }

    /// Registers a route that bypasses the dynamic chain, such as static assets.
    #[must_use]
    pub fn static_route(mut self, pattern: impl Into<String>, method_route: MethodRoute) -> Self {
        self.entries.push((pattern.into(), RouteKind::Static, method_route));
        self
    }

    pub fn build(self) -> Result<Router, RouterError> {
        let mut routes: Vec<Route> = Vec::new();

        for (raw, kind, method_route) in self.entries {
            let pattern = Pattern::parse(&raw)?;

            for (method, handler) in method_route.handlers {
                if routes.iter().any(|route| route.method == method && route.pattern.same_shape(&pattern)) {
                    return Err(RouterError::DuplicateRoute { method, pattern: raw });
                }
                routes.push(Route { method, pattern: pattern.clone(), kind, handler });
            }
        }

        routes.sort_by(|a, b| a.pattern.specificity(&b.pattern));
        Ok(Router { routes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestContext, handler_fn};
    use bytes::Bytes;
    use http::Request;

    fn named(name: &'static str) -> impl RequestHandler {
        handler_fn(move |_req: RequestContext| async move { name })
    }

    fn router() -> Router {
        Router::builder()
            .route("/", get(named("home")))
            .route("/snippet/view/:id", get(named("view")))
            .route("/snippet/view/latest", get(named("latest")))
            .route("/snippet/create", get(named("create_form")).post(named("create")))
            .static_route("/static/*filepath", get(named("static")))
            .build()
            .unwrap()
    }

    async fn resolve(router: &Router, method: Method, path: &str) -> (String, PathParams) {
        match router.at(&method, path) {
            RouteMatch::Found { handler, params, .. } => {
                let response = handler.invoke(RequestContext::from(Request::new(Bytes::new()))).await;
                (String::from_utf8(response.body().to_vec()).unwrap(), params)
            }
            other => panic!("expected a match for {method} {path}, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn captures_named_segment() {
        let (name, params) = resolve(&router(), Method::GET, "/snippet/view/12").await;
        assert_eq!(name, "view");
        assert_eq!(params.get("id"), Some("12"));
    }

    #[tokio::test]
    async fn static_segment_beats_named_segment() {
        let (name, params) = resolve(&router(), Method::GET, "/snippet/view/latest").await;
        assert_eq!(name, "latest");
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn wildcard_captures_rest_of_path() {
        let router = router();
        let (name, params) = resolve(&router, Method::GET, "/static/css/main.css").await;
        assert_eq!(name, "static");
        assert_eq!(params.get("filepath"), Some("css/main.css"));

        assert!(matches!(router.at(&Method::GET, "/static/img/logo.png"), RouteMatch::Found { kind: RouteKind::Static, .. }));
    }

    #[tokio::test]
    async fn named_segment_beats_trailing_wildcard() {
        let router = Router::builder()
            .route("/static/:file", get(named("file")))
            .static_route("/static/*filepath", get(named("tree")))
            .build()
            .unwrap();

        let (name, params) = resolve(&router, Method::GET, "/static/a").await;
        assert_eq!(name, "file");
        assert_eq!(params.get("file"), Some("a"));

        let (name, params) = resolve(&router, Method::GET, "/static/a/b").await;
        assert_eq!(name, "tree");
        assert_eq!(params.get("filepath"), Some("a/b"));
    }

    #[tokio::test]
    async fn segments_are_percent_decoded() {
        let router = router();

        let (name, params) = resolve(&router, Method::GET, "/snippet/view/%31").await;
        assert_eq!(name, "view");
        assert_eq!(params.get("id"), Some("1"));

        let (name, _) = resolve(&router, Method::GET, "/snippet/view/l%61test").await;
        assert_eq!(name, "latest");

        let (_, params) = resolve(&router, Method::GET, "/static/css/my%20theme.css").await;
        assert_eq!(params.get("filepath"), Some("css/my theme.css"));
    }

    #[test]
    fn malformed_escape_matches_nothing() {
        let router = router();
        for path in ["/snippet/view/%3", "/snippet/view/%zz", "/snippet/view/%+1", "/snippet/view/%ff"] {
            assert!(matches!(router.at(&Method::GET, path), RouteMatch::NotFound), "{path}");
        }
    }

    #[tokio::test]
    async fn head_falls_back_to_get() {
        let (name, _) = resolve(&router(), Method::HEAD, "/").await;
        assert_eq!(name, "home");
    }

    #[test]
    fn matching_is_exact() {
        let router = router();
        assert!(matches!(router.at(&Method::GET, "/snippet/view"), RouteMatch::NotFound));
        assert!(matches!(router.at(&Method::GET, "/snippet/view/"), RouteMatch::NotFound));
        assert!(matches!(router.at(&Method::GET, "/snippet/view/1/extra"), RouteMatch::NotFound));
        assert!(matches!(router.at(&Method::GET, "/missing"), RouteMatch::NotFound));
    }

    #[test]
    fn wrong_method_lists_allowed_methods() {
        let router = router();

        let RouteMatch::MethodNotAllowed { allowed } = router.at(&Method::POST, "/snippet/view/1") else {
            panic!("expected method not allowed");
        };
        assert_eq!(allowed, vec![Method::GET]);

        let RouteMatch::MethodNotAllowed { allowed } = router.at(&Method::DELETE, "/snippet/create") else {
            panic!("expected method not allowed");
        };
        assert_eq!(allowed, vec![Method::GET, Method::POST]);
    }

    #[test]
    fn duplicate_route_is_rejected() {
        let result = Router::builder()
            .route("/snippet/view/:id", get(named("a")))
            .route("/snippet/view/:key", get(named("b")))
            .build();

        assert_eq!(
            result.unwrap_err(),
            RouterError::DuplicateRoute { method: Method::GET, pattern: "/snippet/view/:key".into() }
        );
    }

    #[test]
    fn same_pattern_different_method_is_fine() {
        let result = Router::builder().route("/a", get(named("a"))).route("/a", post(named("b"))).build();
        assert!(result.is_ok());
    }

    #[test]
    fn wildcard_must_be_last() {
        let result = Router::builder().route("/static/*path/more", get(named("a"))).build();
        assert!(matches!(result.unwrap_err(), RouterError::MisplacedWildcard { .. }));
    }

    #[test]
    fn pattern_must_be_rooted() {
        let result = Router::builder().route("snippet", get(named("a"))).build();
        assert!(matches!(result.unwrap_err(), RouterError::InvalidPattern { .. }));

        let result = Router::builder().route("/snippet/:", get(named("a"))).build();
        assert!(matches!(result.unwrap_err(), RouterError::InvalidPattern { .. }));
    }
}
