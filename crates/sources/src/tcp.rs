//! TCP Source - length-prefixed envelope batches
//!
//! The ingestion boundary of the agent. Producers open a TCP connection and
//! stream frames:
//!
//! ```text
//! [4 bytes: length (big-endian)][N bytes: JSON EnvelopeBatch]
//! ```
//!
//! # Design
//!
//! - **One task per connection**: a slow producer never holds up another
//! - **Buffered reads**: `bytes::BytesMut` accumulates partial frames
//! - **Resilient framing**: a frame whose body fails to parse is skipped; an
//!   oversized length prefix closes the connection, since the stream can no
//!   longer be resynchronised
//! - **Timestamps**: envelopes arriving with a zero timestamp are stamped with
//!   the time of receipt before they reach the sink
//!
//! # Example
//!
//! ```ignore
//! use conduit_sources::tcp::{TcpSource, TcpSourceConfig};
//!
//! let config = TcpSourceConfig {
//!     address: "0.0.0.0".into(),
//!     port: 3458,
//!     ..Default::default()
//! };
//!
//! let source = TcpSource::new(config, sink);
//! source.run(cancel).await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::BytesMut;
use conduit_protocol::{Envelope, FrameDecoder, MAX_FRAME_SIZE, ProtocolError};
use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::EnvelopeSink;
use crate::common::SourceMetrics;

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tests;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3458;

/// Default read buffer size per connection (64KB)
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Reserve more room before a read once spare capacity drops below this
const MIN_READ_CAPACITY: usize = 4 * 1024;

/// TCP source configuration
#[derive(Debug, Clone)]
pub struct TcpSourceConfig {
    /// Bind address (e.g., "127.0.0.1", "::1")
    pub address: String,

    /// Listen port, 0 picks an ephemeral port
    pub port: u16,

    /// Initial read buffer size per connection
    pub buffer_size: usize,

    /// Largest accepted frame body
    pub max_frame_size: usize,

    /// TCP keepalive enabled
    pub keepalive: bool,

    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,
}

impl Default for TcpSourceConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_frame_size: MAX_FRAME_SIZE,
            keepalive: true,
            nodelay: true,
        }
    }
}

impl TcpSourceConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// TCP source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error that ends the connection
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// State shared by the accept loop and every connection task
struct Shared {
    config: TcpSourceConfig,
    sink: Arc<dyn EnvelopeSink>,
    metrics: Arc<SourceMetrics>,
}

/// TCP ingestion source
///
/// Accepts connections, decodes envelope batches and hands each envelope to
/// the sink.
pub struct TcpSource {
    shared: Shared,
    listener: Option<TcpListener>,
}

impl TcpSource {
    /// Create a new TCP source
    pub fn new(config: TcpSourceConfig, sink: Arc<dyn EnvelopeSink>) -> Self {
        Self {
            shared: Shared {
                config,
                sink,
                metrics: Arc::new(SourceMetrics::new()),
            },
            listener: None,
        }
    }

    /// Get reference to metrics
    pub fn metrics(&self) -> &SourceMetrics {
        &self.shared.metrics
    }

    /// Get a metrics handle that stays valid after `run()` consumes the source
    pub fn metrics_handle(&self) -> Arc<SourceMetrics> {
        Arc::clone(&self.shared.metrics)
    }

    /// Bind the listener ahead of `run()`
    ///
    /// Returns the bound address, which is how callers learn the port when
    /// configured with port 0. Calling it twice is a no-op.
    pub async fn bind(&mut self) -> Result<SocketAddr, SourceError> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let bind_addr = self.shared.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| SourceError::Bind {
                address: bind_addr.clone(),
                source: e,
            })?;

        let local_addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(local_addr)
    }

    /// Address the listener is bound to, once bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Run the TCP source
    ///
    /// Binds (unless `bind` was already called) and accepts connections until
    /// cancelled. Cancellation also closes every open connection.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), SourceError> {
        let local_addr = self.bind().await?;
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };

        tracing::info!(address = %local_addr, "TCP source listening");

        accept_loop(Arc::new(self.shared), listener, cancel).await;
        Ok(())
    }
}

/// Main accept loop
async fn accept_loop(shared: Arc<Shared>, listener: TcpListener, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = listener.accept() => match result {
                Ok((stream, peer_addr)) => {
                    shared.metrics.connection_opened();

                    let shared = Arc::clone(&shared);
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        if let Err(e) = shared.handle_connection(stream, peer_addr, cancel).await {
                            shared.metrics.error();
                            tracing::debug!(peer = %peer_addr, error = %e, "connection error");
                        }
                        shared.metrics.connection_closed();
                    });
                }
                Err(e) => {
                    // Transient accept errors - log and continue
                    tracing::warn!(error = %e, "accept error");
                    shared.metrics.error();
                }
            },
        }
    }

    tracing::info!("TCP source stopped");
}

impl Shared {
    /// Handle a single connection
    async fn handle_connection(
        &self,
        mut stream: TcpStream,
        peer_addr: SocketAddr,
        cancel: CancellationToken,
    ) -> Result<(), SourceError> {
        self.configure_socket(&stream);

        let decoder = FrameDecoder::with_max_frame_size(self.config.max_frame_size);
        let mut buf = BytesMut::with_capacity(self.config.buffer_size);

        tracing::debug!(peer = %peer_addr, "producer connected");

        loop {
            if buf.capacity() - buf.len() < MIN_READ_CAPACITY {
                buf.reserve(self.config.buffer_size.max(MIN_READ_CAPACITY));
            }

            let read = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                read = stream.read_buf(&mut buf) => read?,
            };

            if read == 0 {
                if !buf.is_empty() {
                    tracing::debug!(
                        peer = %peer_addr,
                        trailing_bytes = buf.len(),
                        "producer disconnected mid-frame"
                    );
                }
                return Ok(());
            }
            self.metrics.bytes_received(read as u64);

            loop {
                match decoder.decode(&mut buf) {
                    Ok(Some(batch)) => self.dispatch(batch.batch),
                    Ok(None) => break,
                    Err(ProtocolError::Decode(e)) => {
                        self.metrics.frame_malformed();
                        tracing::debug!(peer = %peer_addr, error = %e, "skipping malformed frame");
                    }
                    Err(e) => {
                        self.metrics.frame_malformed();
                        return Err(e.into());
                    }
                }
            }
        }
    }

    /// Stamp and forward one decoded batch
    fn dispatch(&self, batch: Vec<Envelope>) {
        let count = batch.len() as u64;
        let now = now_nanos();

        for mut envelope in batch {
            if envelope.timestamp == 0 {
                envelope.timestamp = now;
            }
            self.sink.accept(envelope);
        }

        self.metrics.envelopes_received(count);
    }

    fn configure_socket(&self, stream: &TcpStream) {
        let socket = SockRef::from(stream);

        if self.config.nodelay && socket.set_nodelay(true).is_err() {
            tracing::debug!("failed to set TCP_NODELAY");
        }

        // Detect dead producers
        if self.config.keepalive {
            let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(60));

            #[cfg(target_os = "linux")]
            let keepalive = keepalive.with_interval(Duration::from_secs(10));

            if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
                tracing::debug!(error = %e, "failed to set TCP keepalive");
            }
        }
    }
}

/// Current wall-clock time in nanoseconds since the epoch, never zero
fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
        .max(1)
}
