//! TCP listener for accepting Kafka client connections.
//!
//! The listener accepts connections and spawns a task for each one,
//! delegating to the connection handler for request processing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ListenConfig;
use crate::error::{BrokerError, Result};
use crate::handlers::Dispatcher;

use super::connection::ConnectionHandler;

/// TCP listener that accepts client connections.
pub struct BrokerListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    max_connections: usize,
    dispatcher: Arc<Dispatcher>,
    shutdown_tx: broadcast::Sender<()>,
    active_connections: Arc<AtomicUsize>,
}

impl BrokerListener {
    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the listen address fails.
    pub async fn bind(config: &ListenConfig, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let listener = TcpListener::bind(&config.address).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            listener,
            local_addr,
            max_connections: config.max_connections,
            dispatcher,
            shutdown_tx,
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The bound address; resolves port 0 to the assigned port.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get a shutdown handle to signal the listener to stop.
    #[must_use]
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Get the current number of active connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Run the listener, accepting connections until shutdown.
    ///
    /// # Errors
    ///
    /// Accept failures are logged and do not stop the listener; this only
    /// returns once shutdown is signalled.
    #[instrument(skip(self), fields(address = %self.local_addr))]
    pub async fn run(&self) -> Result<()> {
        info!(address = %self.local_addr, "broker listening");

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((socket, addr)) => {
                            let current = self.active_connections.load(Ordering::Relaxed);

                            if current >= self.max_connections {
                                warn!(
                                    peer = %addr,
                                    active = current,
                                    max = self.max_connections,
                                    "connection rejected: limit reached"
                                );
                                continue;
                            }

                            self.active_connections.fetch_add(1, Ordering::Relaxed);
                            debug!(peer = %addr, active = current + 1, "accepted connection");

                            let dispatcher = Arc::clone(&self.dispatcher);
                            let shutdown_rx = self.shutdown_tx.subscribe();
                            let active_connections = Arc::clone(&self.active_connections);

                            tokio::spawn(async move {
                                let handler = ConnectionHandler::new(dispatcher, shutdown_rx);
                                if let Err(e) = handler.handle(socket).await {
                                    match &e {
                                        BrokerError::Shutdown => {
                                            debug!(peer = %addr, "connection closed: shutdown");
                                        }
                                        BrokerError::Connection(io_err)
                                            if matches!(
                                                io_err.kind(),
                                                std::io::ErrorKind::UnexpectedEof
                                                    | std::io::ErrorKind::ConnectionReset
                                                    | std::io::ErrorKind::BrokenPipe
                                            ) =>
                                        {
                                            debug!(peer = %addr, "client disconnected");
                                        }
                                        _ => {
                                            error!(peer = %addr, error = %e, "connection error");
                                        }
                                    }
                                }
                                active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "accept error");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        let active = self.active_connections.load(Ordering::Relaxed);
        if active > 0 {
            info!(active, "connections closing on shutdown");
        }

        Ok(())
    }
}
