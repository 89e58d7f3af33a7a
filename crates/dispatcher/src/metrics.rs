//! Per-sink delivery counters

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// What happened to one output on its way to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Written { update_count: u64 },
    Failed,
    /// Queue was full when the dispatcher tried to enqueue
    Dropped,
}

/// Lock-free counters shared between a `SinkHandle` and its worker
#[derive(Debug, Default)]
pub struct SinkMetrics {
    queued: AtomicUsize,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    last_update: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, delivery: Delivery) {
        match delivery {
            Delivery::Written { update_count } => {
                self.written.fetch_add(1, Ordering::Relaxed);
                self.last_update.store(update_count, Ordering::Relaxed);
            }
            Delivery::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            Delivery::Dropped => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn observe_queue(&self, len: usize) {
        self.queued.store(len, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queued.load(Ordering::Relaxed),
            write_count: self.written.load(Ordering::Relaxed),
            failure_count: self.failed.load(Ordering::Relaxed),
            dropped_count: self.dropped.load(Ordering::Relaxed),
            last_update: self.last_update.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    /// `update_count` of the newest output written
    pub last_update: u64,
}

impl MetricsSnapshot {
    /// Outputs that reached the sink queue, written or not
    pub fn attempted(&self) -> u64 {
        self.write_count + self.failure_count
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "written={} failed={} dropped={} last_update={}",
            self.write_count, self.failure_count, self.dropped_count, self.last_update
        )
    }
}
