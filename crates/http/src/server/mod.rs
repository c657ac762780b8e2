//! The embedded HTTP server: accept loop, connection registry, idle reaper.
//!
//! [`HttpServer`] owns the listening socket and the [`ConnectionRegistry`]
//! tracking every live connection. Accepted sockets are served on their own
//! task; a single dedicated sweeper task evicts connections that have been
//! idle beyond the configured threshold, independently of how busy the
//! connection-serving tasks are.
//!
//! Shutdown follows a strict order: stop accepting, stop and join the
//! sweeper, then drop the remaining clients. This keeps the sweeper and the
//! shutdown path from closing the same connections concurrently.

mod registry;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::connection::ClientConnection;
use crate::handler::Handler;
use crate::server::registry::{ConnectionRegistry, TrackedReader};

/// Configures and binds an [`HttpServer`].
#[derive(Debug)]
pub struct ServerBuilder {
    port: u16,
    max_header_bytes: usize,
    idle_timeout: Duration,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { port: 80, max_header_bytes: 8 * 1024, idle_timeout: Duration::from_secs(30) }
    }

    /// TCP port to listen on. Defaults to 80; use 0 to let the OS pick one.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Upper bound for a request's header block, in bytes.
    ///
    /// This is the memory bound enforced by the parser per connection; a
    /// request exceeding it is answered with `413` and the connection drops.
    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    /// How long a connection may stay idle before the sweeper closes it.
    ///
    /// Defaults to 30 seconds and can be changed at runtime through
    /// [`ServerHandle::set_idle_timeout`].
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Binds the listening socket and produces a runnable server.
    pub async fn bind(self) -> io::Result<HttpServer> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], self.port))).await?;
        Ok(HttpServer {
            listener,
            max_header_bytes: self.max_header_bytes,
            registry: Arc::new(ConnectionRegistry::new(self.idle_timeout)),
            shutdown: CancellationToken::new(),
        })
    }
}

/// A bound HTTP server, ready to serve connections.
#[derive(Debug)]
pub struct HttpServer {
    listener: TcpListener,
    max_header_bytes: usize,
    registry: Arc<ConnectionRegistry>,
    shutdown: CancellationToken,
}

impl HttpServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The address the server is listening on; useful after binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle for controlling the server while [`HttpServer::run`] owns it.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle { registry: Arc::clone(&self.registry), shutdown: self.shutdown.clone() }
    }

    /// Serves connections until [`ServerHandle::shutdown`] is called.
    pub async fn run<H>(self, handler: Arc<H>)
    where
        H: Handler + 'static,
        <H as Handler>::Error: Send,
    {
        match self.listener.local_addr() {
            Ok(address) => info!(address = %address, "start listening"),
            Err(_) => info!("start listening"),
        }

        let sweeper_stop = CancellationToken::new();
        let sweeper = tokio::spawn({
            let registry = Arc::clone(&self.registry);
            let stop = sweeper_stop.clone();
            async move { registry.sweep(stop).await }
        });

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => self.serve_connection(stream, remote_addr, &handler),
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                }
            }
        }

        // The accept path is already closed at this point; the sweeper joins
        // next so the final cleanup cannot race it over the same connections.
        info!("shutting down, no longer accepting connections");
        sweeper_stop.cancel();
        if let Err(e) = sweeper.await {
            error!(cause = %e, "idle sweeper task failed");
        }
        self.registry.drop_all();
    }

    fn serve_connection<H>(&self, stream: TcpStream, remote_addr: SocketAddr, handler: &Arc<H>)
    where
        H: Handler + 'static,
        <H as Handler>::Error: Send,
    {
        let token = CancellationToken::new();
        let entry = self.registry.register(token.clone());

        let registry = Arc::clone(&self.registry);
        let handler = Arc::clone(handler);
        let max_header_bytes = self.max_header_bytes;

        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            let reader = TrackedReader::new(reader, Arc::clone(&entry));
            let connection = ClientConnection::new(reader, writer, max_header_bytes);

            tokio::select! {
                _ = token.cancelled() => {
                    info!(remote = %remote_addr, "connection dropped");
                }
                result = connection.process(handler) => match result {
                    Ok(()) => info!(remote = %remote_addr, "finished process, connection shutdown"),
                    Err(e) => error!(remote = %remote_addr, cause = %e, "connection failed, connection shutdown"),
                }
            }

            registry.disconnected(&entry);
        });
    }
}

/// Clonable control surface for a running server.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    registry: Arc<ConnectionRegistry>,
    shutdown: CancellationToken,
}

impl ServerHandle {
    /// Changes the idle threshold; takes effect immediately, the sweeper is
    /// woken rather than left sleeping on the old interval.
    pub fn set_idle_timeout(&self, timeout: Duration) {
        self.registry.set_idle_timeout(timeout);
    }

    pub fn idle_timeout(&self) -> Duration {
        self.registry.idle_timeout()
    }

    /// Number of connections currently tracked as live.
    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Forcefully closes every live connection without stopping the server.
    pub fn drop_all_clients(&self) {
        self.registry.drop_all();
    }

    /// Signals the server to stop. Safe to call more than once;
    /// [`HttpServer::run`] returns after the last connection is dropped.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
