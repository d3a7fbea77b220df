//! Per-connection serving loop.

mod http_connection;

pub use http_connection::HttpConnection;
