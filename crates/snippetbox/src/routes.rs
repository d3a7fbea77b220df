use std::sync::Arc;

use snippetbox_web::interceptor::{AccessLog, Interceptors, Recovery, SecurityHeaders, SessionAttach};
use snippetbox_web::router::{Router, RouterError, get, post};
use snippetbox_web::session::SessionManager;
use snippetbox_web::{Pipeline, handler_with_state};

use crate::app::Application;
use crate::handlers;

/// The route table behind the outer and dynamic chains.
pub fn routes(app: Arc<Application>, sessions: Arc<SessionManager>) -> Result<Pipeline, RouterError> {
    let router = Router::builder()
        .route("/", get(handler_with_state(Arc::clone(&app), handlers::home)))
        .route("/snippet/view/:id", get(handler_with_state(Arc::clone(&app), handlers::snippet_view)))
        .route(
            "/snippet/create",
            get(handler_with_state(Arc::clone(&app), handlers::snippet_create))
                .post(handler_with_state(Arc::clone(&app), handlers::snippet_create_post)),
        )
        .route(
            "/user/signup",
            get(handler_with_state(Arc::clone(&app), handlers::user_signup))
                .post(handler_with_state(Arc::clone(&app), handlers::user_signup_post)),
        )
        .route(
            "/user/login",
            get(handler_with_state(Arc::clone(&app), handlers::user_login))
                .post(handler_with_state(Arc::clone(&app), handlers::user_login_post)),
        )
        .route("/user/logout", post(handler_with_state(Arc::clone(&app), handlers::user_logout_post)))
        .static_route("/static/*filepath", get(handler_with_state(app, handlers::static_file)))
        .build()?;

    let outer = Interceptors::builder().add_last(Recovery).add_last(AccessLog).add_last(SecurityHeaders).build();
    let dynamic = Interceptors::builder().add_last(SessionAttach::new(sessions)).build();

    Ok(Pipeline::new(router, outer, dynamic))
}
