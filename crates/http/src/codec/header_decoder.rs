//! Request head decoding.
//!
//! Parses the request line and header fields with `httparse`, enforces the
//! size limits below and works out how much body follows.

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Request};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes a [`RequestHeader`] and the [`PayloadSize`] announced by it.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // shortest valid request is "GET / HTTP/1.1\r\n\r\n"
        if src.len() < 14 {
            return Ok(None);
        }

        let parsed = {
            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
            let mut req = httparse::Request::new(&mut headers);

            let status = req.parse(&src[..]).map_err(|e| match e {
                Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
                e => ParseError::invalid_header(e.to_string()),
            })?;

            match status {
                Status::Complete(body_offset) => {
                    trace!(header_size = body_offset, "parsed request header");
                    ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));
                    Some((build_header(&req)?, body_offset))
                }
                Status::Partial => {
                    ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                    None
                }
            }
        };

        match parsed {
            Some((header, body_offset)) => {
                src.advance(body_offset);
                let payload_size = parse_payload(&header)?;
                Ok(Some((header, payload_size)))
            }
            None => Ok(None),
        }
    }
}

fn build_header(req: &httparse::Request<'_, '_>) -> Result<RequestHeader, ParseError> {
    let version = match req.version {
        Some(0) => http::Version::HTTP_10,
        Some(1) => http::Version::HTTP_11,
        _ => return Err(ParseError::InvalidVersion(req.version)),
    };

    let mut builder = Request::builder()
        .method(req.method.ok_or(ParseError::InvalidMethod)?)
        .uri(req.path.ok_or(ParseError::InvalidUri)?)
        .version(version);

    if let Some(headers) = builder.headers_mut() {
        headers.reserve(req.headers.len());
        for header in req.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
            headers.append(name, value);
        }
    }

    // httparse already validated the method token, so only the uri can be rejected here
    builder.body(()).map(RequestHeader::from).map_err(|_| ParseError::InvalidUri)
}

/// Determines the body size according to RFC 9112 section 6.
///
/// Only `Content-Length` framed bodies are accepted; any `Transfer-Encoding`
/// on a request is refused.
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    let te_header = header.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = header.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::Empty),

        (Some(te_value), _) => {
            Err(ParseError::unsupported_transfer_encoding(String::from_utf8_lossy(te_value.as_bytes())))
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(PayloadSize::Length(length))
        }
    }
}
