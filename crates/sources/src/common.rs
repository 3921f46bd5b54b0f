//! Source metrics
//!
//! Plain atomics, shared by reference between the accept loop and every
//! connection task.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a source
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Currently open connections
    pub connections_active: AtomicU64,

    /// Connections accepted since start
    pub connections_total: AtomicU64,

    /// Envelopes handed to the sink
    pub envelopes_received: AtomicU64,

    /// Raw bytes read from sockets
    pub bytes_received: AtomicU64,

    /// Frames whose body failed to decode
    pub frames_malformed: AtomicU64,

    /// Accept and connection errors
    pub errors: AtomicU64,
}

impl SourceMetrics {
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            envelopes_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_malformed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn envelopes_received(&self, count: u64) {
        self.envelopes_received.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a frame that could not be decoded
    #[inline]
    pub fn frame_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            envelopes_received: self.envelopes_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`SourceMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub envelopes_received: u64,
    pub bytes_received: u64,
    pub frames_malformed: u64,
    pub errors: u64,
}
