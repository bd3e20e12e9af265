//! Per-link counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for one worker link.
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// Subbands streamed over this link
    pub subbands_sent: AtomicU64,

    /// Bytes written to this link
    pub bytes_sent: AtomicU64,

    /// Transport failures observed
    pub failures: AtomicU64,
}

impl LinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successfully streamed subband
    pub fn record_subband(&self, bytes: u64) {
        self.subbands_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a transport failure
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            subbands_sent: self.subbands_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of one link's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    /// Subbands streamed over this link
    pub subbands_sent: u64,
    /// Bytes written to this link
    pub bytes_sent: u64,
    /// Transport failures observed
    pub failures: u64,
}
