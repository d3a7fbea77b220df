//! Streaming request decoder.
//!
//! The decoder runs in two phases: it first parses a request head with
//! [`HeaderDecoder`], then, if the head announced a body, hands out chunks via
//! [`LengthDecoder`] until [`PayloadItem::Eof`]. A body is refused up front
//! when its announced length exceeds the configured limit.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::{HeaderDecoder, LengthDecoder};
use crate::ensure;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};

/// Default upper bound for a request body.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 1024 * 1024;

/// Decoder for HTTP/1.x requests.
///
/// `payload_decoder` is `None` while a head is being parsed and `Some` while
/// the body of the current request is being read.
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<LengthDecoder>,
    max_body_size: u64,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_body_size(max_body_size: u64) -> Self {
        Self { max_body_size, ..Self::default() }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, payload_decoder: None, max_body_size: DEFAULT_MAX_BODY_SIZE }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(PayloadItem::Eof) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(PayloadItem::Eof))
                }
                None => None,
            };

            return Ok(message);
        }

        let Some((header, payload_size)) = self.header_decoder.decode(src)? else {
            return Ok(None);
        };

        ensure!(
            payload_size.len() <= self.max_body_size,
            ParseError::too_large_body(payload_size.len(), self.max_body_size)
        );

        self.payload_decoder = Some(LengthDecoder::new(payload_size.len()));
        Ok(Some(Message::Header((header, payload_size))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use indoc::indoc;

    #[test]
    fn head_then_body_then_eof() {
        let str = indoc! {r##"
        POST /snippet/create HTTP/1.1
        Content-Type: application/x-www-form-urlencoded
        Content-Length: 10

        title=Moon"##};

        let mut buf = BytesMut::from(str);
        let mut decoder = RequestDecoder::new();

        let Some(Message::Header((header, size))) = decoder.decode(&mut buf).unwrap() else {
            panic!("expected a request head");
        };
        assert_eq!(header.method(), &Method::POST);
        assert_eq!(size, PayloadSize::Length(10));

        let Some(Message::Payload(PayloadItem::Chunk(chunk))) = decoder.decode(&mut buf).unwrap() else {
            panic!("expected a body chunk");
        };
        assert_eq!(&chunk[..], b"title=Moon");

        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Payload(PayloadItem::Eof))));
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn bodyless_request_still_ends_with_eof() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nHost: a\r\n\r\nGET /next HTTP/1.1\r\nHost: a\r\n\r\n");
        let mut decoder = RequestDecoder::new();

        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Header(_))));
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Payload(PayloadItem::Eof))));

        let Some(Message::Header((header, _))) = decoder.decode(&mut buf).unwrap() else {
            panic!("expected the pipelined request");
        };
        assert_eq!(header.uri().path(), "/next");
    }

    #[test]
    fn refuses_oversized_body() {
        let mut buf = BytesMut::from("POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\n");
        let mut decoder = RequestDecoder::with_max_body_size(10);

        let error = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(error, ParseError::TooLargeBody { size: 11, max_size: 10 }));
    }
}
