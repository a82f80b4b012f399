//! Unix socket stream provider
//!
//! Each subscription is its own connection: connect, send one `Subscribe`
//! frame, then read `Record` frames until the session unsubscribes or the
//! server goes away. Changing the sample rate therefore always means a new
//! connection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use livedebug_config::ProviderConfig;

use crate::error::{Result, SessionError};
use crate::provider::protocol::{StreamMessage, split_frame};
use crate::provider::{RecordSink, StreamProvider, SubscribeRequest, SubscriptionHandle};

/// Read buffer size per connection
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Default connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Provider that streams records from a live-debug Unix socket
#[derive(Debug)]
pub struct SocketProvider {
    /// Path to the Unix socket
    socket_path: PathBuf,
    /// Maximum time to wait for a connection
    connect_timeout: Duration,
    /// Reader tasks by subscription id
    connections: Mutex<HashMap<u64, CancellationToken>>,
    /// Next subscription id
    next_id: AtomicU64,
}

impl SocketProvider {
    /// Create a provider for the socket at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            socket_path: path.as_ref().to_path_buf(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a provider from configuration
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(&config.socket_path).with_connect_timeout(config.connect_timeout)
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Get the socket path
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Number of open subscriptions
    #[cfg(test)]
    pub(crate) fn active_connections(&self) -> usize {
        self.connections.lock().len()
    }

    async fn connect(&self) -> Result<UnixStream> {
        let path = self.socket_path.display();
        match tokio::time::timeout(self.connect_timeout, UnixStream::connect(&self.socket_path))
            .await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(SessionError::Subscription(format!(
                "failed to connect to {path}: {e}"
            ))),
            Err(_) => Err(SessionError::Subscription(format!(
                "timed out connecting to {path}"
            ))),
        }
    }
}

#[async_trait]
impl StreamProvider for SocketProvider {
    async fn subscribe(
        &self,
        request: &SubscribeRequest,
        sink: RecordSink,
    ) -> Result<SubscriptionHandle> {
        let mut stream = self.connect().await?;

        let encoded = StreamMessage::Subscribe(request.clone()).encode();
        stream.write_all(&encoded).await.map_err(|e| {
            SessionError::Subscription(format!("failed to send subscribe request: {e}"))
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        self.connections.lock().insert(id, cancel.clone());

        debug!(
            id,
            component_id = %request.component_id,
            sample_rate = request.sample_rate,
            "socket subscription established"
        );

        tokio::spawn(read_records(id, stream, sink, cancel));

        Ok(SubscriptionHandle::new(id))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        let id = handle.id();
        let cancel = self
            .connections
            .lock()
            .remove(&id)
            .ok_or(SessionError::SubscriptionNotFound { id })?;

        cancel.cancel();
        debug!(id, "socket subscription closed");
        Ok(())
    }
}

/// Read frames until cancelled, the session goes away, or the stream fails
async fn read_records(id: u64, mut stream: UnixStream, sink: RecordSink, cancel: CancellationToken) {
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        // Drain complete frames first
        loop {
            let frame = match split_frame(&mut buf) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!(id, error = %e, "dropping socket subscription");
                    sink.fail(e.to_string());
                    return;
                }
            };

            match StreamMessage::decode(frame) {
                Ok(StreamMessage::Record(text)) => {
                    if !sink.deliver(text) {
                        debug!(id, "session gone, closing stream");
                        return;
                    }
                }
                Ok(StreamMessage::Heartbeat) => {
                    trace!(id, "heartbeat");
                }
                Ok(StreamMessage::Error(msg)) => {
                    warn!(id, error = %msg, "provider reported error");
                    sink.fail(msg);
                    return;
                }
                Ok(StreamMessage::Subscribe(_)) => {
                    // Server shouldn't send this
                    debug!(id, "ignoring unexpected subscribe frame");
                }
                Err(e) => {
                    warn!(id, error = %e, "dropping socket subscription");
                    sink.fail(e.to_string());
                    return;
                }
            }
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                trace!(id, "reader cancelled");
                return;
            }
            read = stream.read_buf(&mut buf) => match read {
                Ok(0) => {
                    debug!(id, "stream closed by provider");
                    sink.fail("stream closed by provider");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    sink.fail(format!("failed to read from socket: {e}"));
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "socket_test.rs"]
mod tests;
