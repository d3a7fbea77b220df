//! Response serialization.
//!
//! Responses are fully buffered by the time they reach the wire, so the encoder
//! always frames them with an exact `Content-Length`.

use std::io;
use std::io::{ErrorKind, Write};

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderValue, Method, Response, Version, header};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::protocol::SendError;

/// Initial buffer size reserved for the status line and headers
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encodes an `http::Response<Bytes>` as an HTTP/1.1 message.
///
/// A `HEAD` response keeps its `Content-Length` but carries no body; use
/// [`ResponseEncoder::for_method`] before encoding the answer to such a request.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    skip_body: bool,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares the encoder for the response to a request with `method`.
    pub fn for_method(&mut self, method: &Method) {
        self.skip_body = *method == Method::HEAD;
    }
}

impl Encoder<Response<Bytes>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut parts, body) = item.into_parts();

        dst.reserve(INIT_HEADER_SIZE + body.len());
        match parts.version {
            Version::HTTP_11 | Version::HTTP_10 => {
                write!(
                    FastWrite(dst),
                    "HTTP/1.1 {} {}\r\n",
                    parts.status.as_str(),
                    parts.status.canonical_reason().unwrap_or("Unknown")
                )?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        parts.headers.remove(header::TRANSFER_ENCODING);

        for (header_name, header_value) in &parts.headers {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");

        if !std::mem::take(&mut self.skip_body) {
            dst.put_slice(&body);
        }
        Ok(())
    }
}

/// `io::Write` adapter over an already reserved `BytesMut`.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn encode(encoder: &mut ResponseEncoder, response: Response<Bytes>) -> String {
        let mut dst = BytesMut::new();
        encoder.encode(response, &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn writes_status_line_headers_and_body() {
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Bytes::from_static(b"hello"))
            .unwrap();

        let raw = encode(&mut ResponseEncoder::new(), response);

        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.contains("content-type: text/plain\r\n"));
        assert!(raw.contains("content-length: 5\r\n"));
        assert!(raw.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn overrides_wrong_content_length() {
        let response = Response::builder()
            .status(StatusCode::SEE_OTHER)
            .header(header::CONTENT_LENGTH, "99")
            .header(header::LOCATION, "/snippet/view/1")
            .body(Bytes::new())
            .unwrap();

        let raw = encode(&mut ResponseEncoder::new(), response);

        assert!(raw.starts_with("HTTP/1.1 303 See Other\r\n"));
        assert!(raw.contains("content-length: 0\r\n"));
        assert!(!raw.contains("99"));
    }

    #[test]
    fn head_response_has_no_body() {
        let mut encoder = ResponseEncoder::new();
        encoder.for_method(&Method::HEAD);

        let raw = encode(&mut encoder, Response::new(Bytes::from_static(b"hello")));
        assert!(raw.contains("content-length: 5\r\n"));
        assert!(raw.ends_with("\r\n\r\n"));

        // only the next response is affected
        let raw = encode(&mut encoder, Response::new(Bytes::from_static(b"hello")));
        assert!(raw.ends_with("hello"));
    }
}
