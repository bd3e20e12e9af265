//! Capture counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-worker capture metrics.
///
/// Shared between the capture worker (writer) and the orchestrator/stats
/// side (reader) via `Arc`.
#[derive(Debug, Default)]
pub struct CaptureMetrics {
    /// Frames received and appended
    pub frames_received: AtomicU64,

    /// Frames dropped for a malformed header or payload
    pub frames_rejected: AtomicU64,

    /// Frames dropped for falling behind the retained span
    pub frames_late: AtomicU64,

    /// Samples (per subband) appended to the channel
    pub samples_written: AtomicU64,
}

impl CaptureMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully appended frame
    pub fn record_frame(&self, samples: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.samples_written.fetch_add(samples, Ordering::Relaxed);
    }

    /// Record a malformed frame
    pub fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame that arrived too late to land in the ring
    pub fn record_late(&self) {
        self.frames_late.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_late: self.frames_late.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the capture counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSnapshot {
    /// Frames received and appended
    pub frames_received: u64,
    /// Frames dropped for a malformed header or payload
    pub frames_rejected: u64,
    /// Frames dropped for falling behind the retained span
    pub frames_late: u64,
    /// Samples appended to the channel
    pub samples_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_records() {
        let m = CaptureMetrics::new();
        m.record_frame(16);
        m.record_frame(16);
        m.record_rejected();
        m.record_late();

        let snap = m.snapshot();
        assert_eq!(snap.frames_received, 2);
        assert_eq!(snap.samples_written, 32);
        assert_eq!(snap.frames_rejected, 1);
        assert_eq!(snap.frames_late, 1);
    }
}
