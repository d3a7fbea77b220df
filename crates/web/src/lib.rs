//! The request pipeline behind snippetbox.
//!
//! A [`Pipeline`] accepts fully buffered requests from the transport and runs
//! them through two interceptor chains around a [`Router`]:
//!
//! ```text
//! Recovery -> AccessLog -> SecurityHeaders -> Router -> SessionAttach -> handler
//! ```
//!
//! The outer chain runs for every request, the dynamic chain only for matched
//! application routes. Handlers receive an owned [`RequestContext`], decode
//! forms with a [`form::FormSpec`], render pages from a [`template::TemplateSet`]
//! and turn their outcome into a response through [`Responder`].

mod handler;
mod pipeline;
mod request;
mod responder;

pub mod error;
pub mod form;
pub mod interceptor;
pub mod router;
pub mod server;
pub mod session;
pub mod template;

pub use error::WebError;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use handler::StateFnHandler;
pub use handler::handler_fn;
pub use handler::handler_with_state;
pub use pipeline::Pipeline;
pub use request::PathParams;
pub use request::RequestContext;
pub use responder::Responder;
pub use responder::html;
pub use responder::redirect;
pub use router::Router;
pub use server::Server;
