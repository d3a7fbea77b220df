//! Protocol types shared by the codec and the connection loop.
//!
//! - [`RequestHeader`]: the parsed request line and headers
//! - [`Message`] / [`PayloadItem`] / [`PayloadSize`]: what the decoder yields
//! - [`ConnectionInfo`]: per-connection facts attached to each request
//! - [`HttpError`], [`ParseError`], [`SendError`]: transport errors

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::ConnectionInfo;
pub use request::RequestHeader;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
