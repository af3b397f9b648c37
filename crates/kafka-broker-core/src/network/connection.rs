//! Per-connection request handler.
//!
//! Reads one frame, dispatches it, writes the response, then reads the next.
//! There is no pipelining: a response is always flushed before the next
//! request is decoded.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, instrument, warn};

use crate::error::{BrokerError, Result};
use crate::handlers::Dispatcher;

use super::codec::KafkaCodec;

/// Handles requests for a single client connection.
pub struct ConnectionHandler {
    dispatcher: Arc<Dispatcher>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl ConnectionHandler {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, shutdown_rx: broadcast::Receiver<()>) -> Self {
        Self {
            dispatcher,
            shutdown_rx,
        }
    }

    /// Handle the connection, processing requests until disconnect or shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error on a decode failure, a handler failure, a socket
    /// error, or [`BrokerError::Shutdown`] when the broker is stopping.
    #[instrument(skip_all)]
    pub async fn handle<S>(mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, KafkaCodec::new());

        loop {
            tokio::select! {
                result = framed.next() => {
                    match result {
                        Some(Ok(frame)) => {
                            debug!(
                                api_key = frame.api_key,
                                api_version = frame.api_version,
                                correlation_id = frame.correlation_id,
                                "received request"
                            );
                            let response = self.dispatcher.dispatch(&frame).await?;
                            framed.send(response).await?;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "protocol decode error");
                            return Err(BrokerError::Connection(e));
                        }
                        None => {
                            debug!("client disconnected");
                            break;
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    debug!("shutdown during connection handling");
                    return Err(BrokerError::Shutdown);
                }
            }
        }

        Ok(())
    }
}
