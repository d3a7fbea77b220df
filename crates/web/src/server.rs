//! TCP accept loop around a [`Pipeline`].
//!
//! Every accepted connection runs on its own task. On shutdown the listener is
//! dropped, each connection is told to close after its in-flight request, and
//! the server waits up to the drain timeout for them to finish.

use std::future::Future;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use snippetbox_http::codec::DEFAULT_MAX_BODY_SIZE;
use snippetbox_http::connection::HttpConnection;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::{select, signal, time};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::Pipeline;

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("pipeline must be set")]
    MissingPipeline,

    #[error("address must be set")]
    MissingAddress,

    #[error("invalid address: {source}")]
    InvalidAddress { source: io::Error },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {address:?}: {source}")]
    Bind { address: Vec<SocketAddr>, source: io::Error },
}

#[derive(Debug)]
pub struct ServerBuilder {
    pipeline: Option<Arc<Pipeline>>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    max_body_size: u64,
    drain_timeout: Duration,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { pipeline: None, address: None, max_body_size: DEFAULT_MAX_BODY_SIZE, drain_timeout: DEFAULT_DRAIN_TIMEOUT }
    }

    #[must_use]
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    #[must_use]
    pub fn pipeline(mut self, pipeline: impl Into<Arc<Pipeline>>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    #[must_use]
    pub fn drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let pipeline = self.pipeline.ok_or(ServerBuildError::MissingPipeline)?;
        let address = self
            .address
            .ok_or(ServerBuildError::MissingAddress)?
            .map_err(|source| ServerBuildError::InvalidAddress { source })?;

        Ok(Server { pipeline, address, max_body_size: self.max_body_size, drain_timeout: self.drain_timeout })
    }
}

#[derive(Debug)]
pub struct Server {
    pipeline: Arc<Pipeline>,
    address: Vec<SocketAddr>,
    max_body_size: u64,
    drain_timeout: Duration,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.address.as_slice())
            .await
            .map_err(|source| ServerError::Bind { address: self.address.clone(), source })?;

        info!(address = ?listener.local_addr().ok(), "start listening");
        self.serve(listener, ctrl_c()).await;
        Ok(())
    }

    /// Serves connections from `listener` until `shutdown` completes, then drains.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let tracker = TaskTracker::new();
        let closing = CancellationToken::new();
        tokio::pin!(shutdown);

        loop {
            let (stream, remote_addr) = select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            let pipeline = Arc::clone(&self.pipeline);
            let closing = closing.clone();
            let max_body_size = self.max_body_size;

            tracker.spawn(async move {
                let (reader, writer) = stream.into_split();
                let connection =
                    HttpConnection::new(reader, writer).with_remote_addr(remote_addr).with_max_body_size(max_body_size);

                match connection.process(pipeline, closing).await {
                    Ok(()) => debug!(%remote_addr, "connection closed"),
                    Err(e) => warn!(%remote_addr, cause = %e, "connection closed with error"),
                }
            });
        }

        drop(listener);
        info!(connections = tracker.len(), "shutting down, draining connections");

        tracker.close();
        closing.cancel();

        if time::timeout(self.drain_timeout, tracker.wait()).await.is_err() {
            warn!(connections = tracker.len(), timeout = ?self.drain_timeout, "drain timed out, dropping connections");
        } else {
            info!("all connections drained");
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        error!(cause = %e, "failed to listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }
}
