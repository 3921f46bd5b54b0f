//! Consumer - one binding's queue and delivery task
//!
//! Each consumer owns a bounded queue and a task that drains it into its own
//! [`Connection`]. A stalled or failed downstream only ever blocks its own
//! task; the writer side uses `try_send` and never waits.
//!
//! Only transport errors and timeouts close a consumer. Envelopes the
//! connection skips as unframeable are counted as `rejected` and delivery
//! carries on.
//!
//! # Lifecycle
//!
//! ```text
//! Connecting ──connect ok──► Live ──removed / send error / timeout──► Draining ──► Closed
//!      │                                                               ▲
//!      └──────────────────connect error / cancelled────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use conduit_protocol::{Binding, Envelope};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connector::{Connection, Connector};
use crate::metrics::RegistryMetrics;
use crate::PipelineError;

/// Default queue depth per consumer
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default envelopes per downstream write
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Default downstream write timeout
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Observable consumer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConsumerState {
    /// Task spawned, connection not yet established; envelopes queue up
    Connecting = 0,
    /// Connected and delivering
    Live = 1,
    /// Shutting down; queued envelopes are discarded
    Draining = 2,
    /// Task finished
    Closed = 3,
}

impl ConsumerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Live,
            2 => Self::Draining,
            _ => Self::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Live => "live",
            Self::Draining => "draining",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State cell shared between a handle and its task
#[derive(Debug)]
struct SharedState(AtomicU8);

impl SharedState {
    fn new(state: ConsumerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> ConsumerState {
        ConsumerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: ConsumerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Delivery settings shared by every consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Bounded queue depth; overflow is dropped and counted
    pub queue_capacity: usize,
    /// Envelopes taken from the queue per downstream write at most
    pub max_batch_size: usize,
    /// A write slower than this closes the consumer
    pub send_timeout: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

/// Registry-side handle to a running consumer
pub(crate) struct ConsumerHandle {
    binding: Binding,
    sender: mpsc::Sender<Arc<Envelope>>,
    state: Arc<SharedState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Spawn the delivery task for `binding`
    ///
    /// Returns immediately; the connect happens inside the task.
    pub(crate) fn spawn(
        binding: Binding,
        connector: Arc<dyn Connector>,
        config: &ConsumerConfig,
        metrics: Arc<RegistryMetrics>,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let state = Arc::new(SharedState::new(ConsumerState::Connecting));

        let task = ConsumerTask {
            binding: binding.clone(),
            receiver,
            connector,
            state: Arc::clone(&state),
            cancel: cancel.clone(),
            max_batch_size: config.max_batch_size.max(1),
            send_timeout: config.send_timeout,
            metrics,
        };

        Self {
            binding,
            sender,
            state,
            cancel,
            task: tokio::spawn(task.run()),
        }
    }

    #[inline]
    pub(crate) fn try_send(
        &self,
        envelope: Arc<Envelope>,
    ) -> Result<(), TrySendError<Arc<Envelope>>> {
        self.sender.try_send(envelope)
    }

    #[inline]
    pub(crate) fn binding(&self) -> &Binding {
        &self.binding
    }

    #[inline]
    pub(crate) fn state(&self) -> ConsumerState {
        self.state.get()
    }

    /// Task has exited (or is exiting) on its own
    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
            || matches!(self.state(), ConsumerState::Draining | ConsumerState::Closed)
    }

    /// Drain, cancel and join the task
    pub(crate) async fn close(self) {
        if self.state() != ConsumerState::Closed {
            self.state.set(ConsumerState::Draining);
        }
        self.cancel.cancel();

        if let Err(e) = self.task.await {
            warn!(binding = %self.binding, error = %e, "consumer task panicked");
        }
    }
}

impl fmt::Debug for ConsumerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerHandle")
            .field("binding", &self.binding)
            .field("state", &self.state())
            .field("queued", &(self.sender.max_capacity() - self.sender.capacity()))
            .finish()
    }
}

/// The delivery task: connect, then drain the queue in batches
struct ConsumerTask {
    binding: Binding,
    receiver: mpsc::Receiver<Arc<Envelope>>,
    connector: Arc<dyn Connector>,
    state: Arc<SharedState>,
    cancel: CancellationToken,
    max_batch_size: usize,
    send_timeout: Duration,
    metrics: Arc<RegistryMetrics>,
}

impl ConsumerTask {
    async fn run(mut self) {
        let connect = tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = self.connector.connect(&self.binding) => Some(result),
        };

        match connect {
            Some(Ok(connection)) => {
                self.state.set(ConsumerState::Live);
                info!(binding = %self.binding, "consumer connected");
                self.deliver(connection).await;
            }
            Some(Err(e)) => {
                warn!(binding = %self.binding, error = %e, "consumer connect failed");
            }
            None => {}
        }

        self.finish();
    }

    /// Deliver until cancelled or the connection fails
    async fn deliver(&mut self, mut connection: Box<dyn Connection>) {
        let mut batch: Vec<Arc<Envelope>> = Vec::with_capacity(self.max_batch_size);

        loop {
            let first = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                envelope = self.receiver.recv() => match envelope {
                    Some(envelope) => envelope,
                    None => return,
                },
            };

            batch.push(first);
            while batch.len() < self.max_batch_size {
                match self.receiver.try_recv() {
                    Ok(envelope) => batch.push(envelope),
                    Err(_) => break,
                }
            }

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = tokio::time::timeout(self.send_timeout, connection.send(&batch)) => result,
            };

            let error = match result {
                Ok(Ok(written)) => {
                    self.record_delivery(batch.len(), written);
                    batch.clear();
                    continue;
                }
                Ok(Err(e)) => e,
                Err(_) => PipelineError::SendTimeout(self.send_timeout),
            };

            warn!(
                binding = %self.binding,
                error = %error,
                batch_size = batch.len(),
                "consumer send failed, closing"
            );
            return;
        }
    }

    /// Count a completed send; anything not written was rejected by the transport
    fn record_delivery(&self, batch_len: usize, written: usize) {
        let written = written.min(batch_len);
        self.metrics.egress.add(written as u64);

        let rejected = batch_len - written;
        if rejected > 0 {
            self.metrics.rejected.add(rejected as u64);
            warn!(
                binding = %self.binding,
                rejected,
                batch_size = batch_len,
                "envelopes too large to frame, dropped"
            );
        }
    }

    /// Discard whatever is still queued and mark the consumer closed
    fn finish(&mut self) {
        self.state.set(ConsumerState::Draining);
        self.receiver.close();

        let mut discarded = 0u64;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }

        debug!(binding = %self.binding, discarded, "consumer closed");
        self.state.set(ConsumerState::Closed);
    }
}
