//! Provider counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-provider counters
#[derive(Debug, Default)]
pub struct ProviderMetrics {
    fixes_emitted: AtomicU64,
    subscriptions: AtomicU64,
    unsubscriptions: AtomicU64,
}

impl ProviderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fix(&self) {
        self.fixes_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscribe(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsubscribe(&self) {
        self.unsubscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProviderMetricsSnapshot {
        ProviderMetricsSnapshot {
            fixes_emitted: self.fixes_emitted.load(Ordering::Relaxed),
            subscriptions: self.subscriptions.load(Ordering::Relaxed),
            unsubscriptions: self.unsubscriptions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ProviderMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderMetricsSnapshot {
    pub fixes_emitted: u64,
    pub subscriptions: u64,
    pub unsubscriptions: u64,
}

impl ProviderMetricsSnapshot {
    /// Subscriptions not yet cancelled
    pub fn live_subscriptions(&self) -> u64 {
        self.subscriptions.saturating_sub(self.unsubscriptions)
    }
}
