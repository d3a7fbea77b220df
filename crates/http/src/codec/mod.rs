//! Codecs turning raw bytes into requests and responses into raw bytes.
//!
//! - [`RequestDecoder`] yields a request head followed by its body chunks
//! - [`ResponseEncoder`] writes a complete, fully buffered response

mod header_decoder;
mod length_decoder;
mod request_decoder;
mod response_encoder;

pub use header_decoder::HeaderDecoder;
pub use length_decoder::LengthDecoder;
pub use request_decoder::{DEFAULT_MAX_BODY_SIZE, RequestDecoder};
pub use response_encoder::ResponseEncoder;
