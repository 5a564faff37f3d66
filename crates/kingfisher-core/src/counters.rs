//! Process-wide ingestion counters.
//!
//! Thread-safe via atomic increments; cheap to clone and share between the
//! receiver, the workers and the supervisor.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default)]
pub struct Counters {
    inner: Arc<CountersInner>,
}

#[derive(Debug, Default)]
struct CountersInner {
    /// Datagrams read off the socket.
    received: AtomicU64,
    /// Datagrams accepted into the work queue.
    enqueued: AtomicU64,
    /// Datagrams dropped because the queue was at capacity.
    overflow_drops: AtomicU64,
    /// Datagrams dequeued by a worker.
    handled: AtomicU64,
    /// Datagrams whose routing completed with every produced row accepted.
    ready_for_insertion: AtomicU64,
    /// Rows refused by sink validation.
    rejected: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.inner.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self) {
        self.inner.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow_drop(&self) {
        self.inner.overflow_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handled(&self) {
        self.inner.handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ready_for_insertion(&self) {
        self.inner.ready_for_insertion.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.inner.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            received: self.inner.received.load(Ordering::Relaxed),
            enqueued: self.inner.enqueued.load(Ordering::Relaxed),
            overflow_drops: self.inner.overflow_drops.load(Ordering::Relaxed),
            handled: self.inner.handled.load(Ordering::Relaxed),
            ready_for_insertion: self.inner.ready_for_insertion.load(Ordering::Relaxed),
            rejected: self.inner.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub received: u64,
    pub enqueued: u64,
    pub overflow_drops: u64,
    pub handled: u64,
    pub ready_for_insertion: u64,
    pub rejected: u64,
}
