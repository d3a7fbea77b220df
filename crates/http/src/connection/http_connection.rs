use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::header::{CONNECTION, EXPECT};
use http::{HeaderValue, Response, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{
    ConnectionInfo, HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, SendError,
};

/// Serves HTTP/1.x requests off one connection, one at a time.
///
/// Each request body is read completely before the handler runs. The
/// connection stays open for further requests unless the client asked for
/// `Connection: close`, the handler's response carries it, or `shutdown` has
/// been cancelled.
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    connection_info: ConnectionInfo,
}

impl<R, W> std::fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection").field("connection_info", &self.connection_info).finish_non_exhaustive()
    }
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            connection_info: ConnectionInfo::default(),
        }
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.connection_info = ConnectionInfo::new(Some(remote_addr));
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        *self.framed_read.decoder_mut() = RequestDecoder::with_max_body_size(max_body_size);
        self
    }

    pub async fn process<H>(mut self, handler: Arc<H>, shutdown: CancellationToken) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        loop {
            let message = select! {
                biased;
                () = shutdown.cancelled() => {
                    debug!("shutdown requested, closing idle connection");
                    return Ok(());
                }
                message = self.framed_read.next() => message,
            };

            match message {
                Some(Ok(Message::Header((header, payload_size)))) => {
                    match self.do_process(header, payload_size, &*handler, &shutdown).await {
                        Ok(true) => {}
                        Ok(false) => {
                            if let Err(e) = self.framed_write.get_mut().shutdown().await {
                                debug!(cause = %e, "failed to shut down writer");
                            }
                            return Ok(());
                        }
                        Err(HttpError::RequestError { source }) => return Err(self.reject(source).await),
                        Err(e) => return Err(e),
                    }
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("received body data while waiting for a request head");
                    return Err(self.reject(ParseError::invalid_body("need header while receive body")).await);
                }

                Some(Err(e)) => return Err(self.reject(e).await),

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    /// Serves one request, returning whether the connection may be reused.
    async fn do_process<H>(
        &mut self,
        header: RequestHeader,
        payload_size: PayloadSize,
        handler: &H,
        shutdown: &CancellationToken,
    ) -> Result<bool, HttpError>
    where
        H: Handler + ?Sized,
    {
        if !payload_size.is_empty() && expects_continue(&header) {
            let writer = self.framed_write.get_mut();
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
            writer.flush().await.map_err(SendError::io)?;
            debug!("receive expect request header, sent continue response");
        }

        let body = self.read_body(payload_size).await?;

        let client_keep_alive = header.keep_alive();
        let method = header.method().clone();
        let mut request = header.body(body);
        request.extensions_mut().insert(self.connection_info);

        let mut response = match handler.call(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(cause = %e, "handle response error");
                build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        let keep_alive = client_keep_alive && !shutdown.is_cancelled() && !wants_close(&response);
        if !keep_alive {
            response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
        }

        self.framed_write.encoder_mut().for_method(&method);
        self.framed_write.send(response).await?;
        Ok(keep_alive)
    }

    async fn read_body(&mut self, payload_size: PayloadSize) -> Result<Bytes, ParseError> {
        let mut body = BytesMut::with_capacity(usize::try_from(payload_size.len()).unwrap_or_default());

        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(chunk)))) => body.extend_from_slice(&chunk),
                Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(body.freeze()),
                Some(Ok(Message::Header(_))) => {
                    return Err(ParseError::invalid_body("received a request head while reading a body"));
                }
                Some(Err(e)) => return Err(e),
                None => return Err(ParseError::invalid_body("connection closed before the body was complete")),
            }
        }
    }

    /// Answers a malformed request with its status and gives up on the connection.
    async fn reject(&mut self, e: ParseError) -> HttpError {
        if matches!(e, ParseError::Io { .. }) {
            return e.into();
        }

        let status = e.status_code();
        warn!(cause = %e, status = status.as_u16(), "can't receive next request");

        let mut response = build_error_response(status);
        response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
        if let Err(send_error) = self.framed_write.send(response).await {
            debug!(cause = %send_error, "failed to send error response");
        }
        e.into()
    }
}

fn expects_continue(header: &RequestHeader) -> bool {
    header.headers().get(EXPECT).is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
}

fn wants_close(response: &Response<Bytes>) -> bool {
    response
        .headers()
        .get(CONNECTION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.split(',').any(|token| token.trim().eq_ignore_ascii_case("close")))
}

fn build_error_response(status_code: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from_static(status_code.canonical_reason().unwrap_or("Error").as_bytes()));
    *response.status_mut() = status_code;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxError, make_handler};
    use http::Request;
    use tokio::io::{AsyncReadExt, DuplexStream, duplex};
    use tokio::task::JoinHandle;

    fn serve<H: Handler + 'static>(handler: H, shutdown: CancellationToken) -> (DuplexStream, JoinHandle<Result<(), HttpError>>) {
        let (client, server) = duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let (reader, writer) = tokio::io::split(server);
            HttpConnection::new(reader, writer)
                .with_remote_addr("127.0.0.1:50000".parse().unwrap())
                .with_max_body_size(64)
                .process(Arc::new(handler), shutdown)
                .await
        });
        (client, handle)
    }

    async fn exchange(client: &mut DuplexStream, raw: &str) -> String {
        client.write_all(raw.as_bytes()).await.unwrap();
        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        out
    }

    async fn echo(req: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        let remote = req.extensions().get::<ConnectionInfo>().and_then(ConnectionInfo::remote_addr);
        let body = format!("{} {} {:?} {}", req.method(), req.uri().path(), remote, String::from_utf8_lossy(req.body()));
        Ok(Response::new(Bytes::from(body)))
    }

    #[tokio::test]
    async fn serves_request_and_honours_close() {
        let (mut client, handle) = serve(make_handler(echo), CancellationToken::new());

        let out = exchange(&mut client, "GET /snippet/view/1 HTTP/1.1\r\nConnection: close\r\n\r\n").await;

        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.contains("connection: close\r\n"));
        assert!(out.ends_with("GET /snippet/view/1 Some(127.0.0.1:50000) "));
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn keeps_connection_alive_between_requests() {
        let (mut client, handle) = serve(make_handler(echo), CancellationToken::new());

        let raw = "GET /one HTTP/1.1\r\nHost: a\r\n\r\nGET /two HTTP/1.1\r\nHost: a\r\nConnection: close\r\n\r\n";
        let out = exchange(&mut client, raw).await;

        assert_eq!(out.matches("HTTP/1.1 200 OK").count(), 2);
        assert!(out.contains("GET /one"));
        assert!(out.contains("GET /two"));
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn buffers_body_after_continue() {
        let (mut client, _handle) = serve(make_handler(echo), CancellationToken::new());

        let raw = concat!(
            "POST /snippet/create HTTP/1.1\r\n",
            "Content-Length: 10\r\n",
            "Expect: 100-continue\r\n",
            "Connection: close\r\n",
            "\r\n",
            "title=Moon",
        );
        let out = exchange(&mut client, raw).await;

        assert!(out.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\n"));
        assert!(out.ends_with("POST /snippet/create Some(127.0.0.1:50000) title=Moon"));
    }

    #[tokio::test]
    async fn handler_error_becomes_500() {
        let handler = make_handler(|_req: Request<Bytes>| async { Err::<Response<Bytes>, BoxError>("boom".into()) });
        let (mut client, _handle) = serve(handler, CancellationToken::new());

        let out = exchange(&mut client, "GET / HTTP/1.1\r\nConnection: close\r\n\r\n").await;

        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn malformed_request_is_rejected() {
        let (mut client, handle) = serve(make_handler(echo), CancellationToken::new());

        let out = exchange(&mut client, "POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n").await;

        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(out.contains("connection: close\r\n"));
        assert!(matches!(handle.await.unwrap(), Err(HttpError::RequestError { .. })));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (mut client, _handle) = serve(make_handler(echo), CancellationToken::new());

        let out = exchange(&mut client, "POST / HTTP/1.1\r\nContent-Length: 65\r\n\r\n").await;

        assert!(out.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[tokio::test]
    async fn shutdown_closes_after_in_flight_request() {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handler = make_handler(move |_req: Request<Bytes>| {
            token.cancel();
            async { Ok::<_, BoxError>(Response::new(Bytes::from_static(b"bye"))) }
        });
        let (mut client, handle) = serve(handler, shutdown);

        let out = exchange(&mut client, "GET / HTTP/1.1\r\nHost: a\r\n\r\n").await;

        assert!(out.contains("connection: close\r\n"));
        assert!(out.ends_with("bye"));
        assert!(handle.await.unwrap().is_ok());
    }
}
