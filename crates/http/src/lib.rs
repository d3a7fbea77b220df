//! The HTTP/1.1 transport underneath snippetbox.
//!
//! This crate owns everything between the TCP stream and a fully buffered
//! [`http::Request`]: header parsing, `Content-Length` bodies, response
//! encoding, keep-alive and connection shutdown. Request processing itself
//! happens behind the [`handler::Handler`] trait, which the web pipeline
//! implements.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use tokio::net::TcpListener;
//! use tokio_util::sync::CancellationToken;
//! use snippetbox_http::connection::HttpConnection;
//! use snippetbox_http::handler::make_handler;
//!
//! # async fn run() -> std::io::Result<()> {
//! let listener = TcpListener::bind("127.0.0.1:4000").await?;
//! let handler = Arc::new(make_handler(|_req: Request<Bytes>| async {
//!     Ok::<_, std::convert::Infallible>(Response::builder().status(StatusCode::OK).body(Bytes::from("hello")).unwrap())
//! }));
//!
//! let (stream, remote_addr) = listener.accept().await?;
//! let (reader, writer) = stream.into_split();
//! let connection = HttpConnection::new(reader, writer).with_remote_addr(remote_addr);
//! let _ = connection.process(handler, CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - request bodies must carry `Content-Length`; chunked uploads are refused
//! - maximum header size: 8KB, maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
