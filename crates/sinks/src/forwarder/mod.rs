//! Forwarder Sink - agent-to-agent delivery over TCP
//!
//! Connects to `tcp://host:port` drains and writes each consumer batch as one
//! frame, or several when the encoded batch is larger than the frame limit.
//! An envelope too large for a frame by itself is skipped; it is not a
//! connection failure.
//!
//! # Protocol
//!
//! Uses the same framing as the ingress source, so a downstream conduit can
//! consume it directly:
//! ```text
//! [4 bytes: length (big-endian)][N bytes: JSON EnvelopeBatch]
//! ```
//!
//! # Example
//!
//! ```ignore
//! let connector = TcpConnector::new(
//!     ForwarderConfig::default().with_connection_timeout(Duration::from_secs(2)),
//! );
//!
//! let mut connection = connector.connect(&binding).await?;
//! let written = connection.send(&batch).await?;
//! ```

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conduit_pipeline::{Connection, Connector, PipelineError};
use conduit_protocol::{Binding, Envelope, MAX_FRAME_SIZE, ProtocolError, encode_frames};
use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Configuration for TCP forwarding
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Connection timeout
    pub connection_timeout: Duration,

    /// Write timeout per frame
    pub write_timeout: Duration,

    /// TCP keep-alive enabled
    pub tcp_keepalive: bool,

    /// TCP keep-alive interval (only used if tcp_keepalive is true)
    pub tcp_keepalive_interval: Duration,

    /// Largest frame body written, at most `MAX_FRAME_SIZE`
    pub max_frame_size: usize,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            tcp_keepalive: true,
            tcp_keepalive_interval: Duration::from_secs(30),
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl ForwarderConfig {
    /// Set connection timeout
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set write timeout
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enable or disable TCP keep-alive
    #[must_use]
    pub fn with_tcp_keepalive(mut self, enabled: bool) -> Self {
        self.tcp_keepalive = enabled;
        self
    }

    /// Set TCP keep-alive interval
    #[must_use]
    pub fn with_tcp_keepalive_interval(mut self, interval: Duration) -> Self {
        self.tcp_keepalive_interval = interval;
        self
    }

    /// Set the frame body limit, capped at `MAX_FRAME_SIZE`
    #[must_use]
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size.min(MAX_FRAME_SIZE);
        self
    }
}

/// Forwarder errors
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    /// Drain is not a usable `tcp://` target
    #[error("invalid drain: {0}")]
    InvalidDrain(#[from] ProtocolError),

    /// Connection failed
    #[error("connection failed to {target}: {source}")]
    ConnectionFailed {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Write failed
    #[error("write to {target} failed: {source}")]
    WriteFailed {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Write timed out
    #[error("write to {target} timed out")]
    Timeout { target: String },
}

impl From<ForwarderError> for PipelineError {
    fn from(err: ForwarderError) -> Self {
        match err {
            ForwarderError::InvalidDrain(e) => PipelineError::InvalidDrain(e),
            ForwarderError::ConnectionFailed { target, source } => {
                PipelineError::connect(target, source)
            }
            ForwarderError::WriteFailed { target, source } => PipelineError::send(target, source),
            ForwarderError::Timeout { target } => PipelineError::send(target, "write timed out"),
        }
    }
}

/// Opens TCP connections to `tcp://` drains
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    config: ForwarderConfig,
}

impl TcpConnector {
    pub fn new(config: ForwarderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Connect to the binding's drain
    pub async fn open(&self, binding: &Binding) -> Result<TcpConnection, ForwarderError> {
        let target = binding.drain()?.address();

        // Connect with timeout
        let connect_result = timeout(
            self.config.connection_timeout,
            TcpStream::connect(target.as_str()),
        )
        .await;

        let stream = match connect_result {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ForwarderError::ConnectionFailed { target, source: e });
            }
            Err(_) => {
                return Err(ForwarderError::ConnectionFailed {
                    target,
                    source: std::io::Error::new(ErrorKind::TimedOut, "connection timed out"),
                });
            }
        };

        // Set TCP_NODELAY for lower latency (non-fatal if it fails)
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(
                binding = %binding,
                error = %e,
                "failed to set TCP_NODELAY, continuing with default buffering"
            );
        }

        // Set TCP keep-alive (non-fatal if it fails)
        if self.config.tcp_keepalive {
            let sock_ref = SockRef::from(&stream);
            let keepalive = TcpKeepalive::new().with_time(self.config.tcp_keepalive_interval);

            // On Linux, also set the interval between probes
            #[cfg(target_os = "linux")]
            let keepalive = keepalive.with_interval(self.config.tcp_keepalive_interval);

            if let Err(e) = sock_ref.set_tcp_keepalive(&keepalive) {
                tracing::debug!(
                    binding = %binding,
                    error = %e,
                    "failed to set TCP keep-alive, continuing without keep-alive"
                );
            }
        }

        tracing::debug!(binding = %binding, target = %target, "connected to drain");

        Ok(TcpConnection {
            stream,
            target,
            write_timeout: self.config.write_timeout,
            max_frame_size: self.config.max_frame_size,
        })
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, binding: &Binding) -> conduit_pipeline::Result<Box<dyn Connection>> {
        let connection = self.open(binding).await?;
        Ok(Box::new(connection))
    }

    fn name(&self) -> &'static str {
        "forwarder"
    }
}

/// One established downstream TCP connection
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    target: String,
    write_timeout: Duration,
    max_frame_size: usize,
}

impl TcpConnection {
    /// `host:port` this connection writes to
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Write one batch, split into frames no larger than the frame limit
    ///
    /// Returns how many envelopes were written; the rest could not fit in a
    /// frame and were skipped. Each frame gets its own write timeout.
    pub async fn send_batch(&mut self, batch: &[Arc<Envelope>]) -> Result<usize, ForwarderError> {
        let encoded = encode_frames(batch, self.max_frame_size);
        if encoded.rejected > 0 {
            tracing::debug!(
                drain = %self.target,
                rejected = encoded.rejected,
                max_frame_size = self.max_frame_size,
                "skipping envelopes larger than one frame"
            );
        }

        for frame in &encoded.frames {
            self.write_frame(frame).await?;
        }
        Ok(encoded.encoded)
    }

    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), ForwarderError> {
        let stream = &mut self.stream;
        let write_result = timeout(self.write_timeout, async {
            stream.write_all(frame).await?;
            stream.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await;

        match write_result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ForwarderError::WriteFailed {
                target: self.target.clone(),
                source: e,
            }),
            Err(_) => Err(ForwarderError::Timeout {
                target: self.target.clone(),
            }),
        }
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, batch: &[Arc<Envelope>]) -> conduit_pipeline::Result<usize> {
        self.send_batch(batch).await.map_err(PipelineError::from)
    }
}

#[cfg(test)]
#[path = "forwarder_test.rs"]
mod forwarder_test;
