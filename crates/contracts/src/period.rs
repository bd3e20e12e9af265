//! Per-period dispatch contracts.
//!
//! A `DispatchUnit` is one subband's worth of work for one integration
//! period; a `PeriodSummary` is what the coordinator reports after driving
//! the dispatcher through a period.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{DelaySample, GapSet, Sample, SampleTime, StreamId};

/// Payload access for one open read window.
///
/// Implemented by the channel's read transaction, consumed by the
/// dispatcher when it streams subband payloads. The view is only valid
/// while the transaction is open.
pub trait PayloadSource {
    /// Window length in samples.
    fn window_len(&self) -> usize;

    /// Copy one subband slot's samples into `out`, zeroing flagged
    /// positions. `out` must be exactly `window_len()` long.
    fn copy_subband(&self, slot: usize, out: &mut [Sample]);
}

/// One metadata record toward a compute worker: the delay correction and
/// flag ranges contributed by a single input stream.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    /// Contributing input stream index
    pub stream: u16,
    /// Whole-sample shift applied to this stream's read window
    pub alignment_shift: i64,
    /// Resolved delay correction for the owning beam
    pub delay: DelaySample,
    /// Window-local flag ranges, bounded to the configured maximum
    pub flags: GapSet,
}

/// One subband's worth of work for one integration period.
#[derive(Debug, Clone)]
pub struct DispatchUnit {
    /// Global subband index
    pub subband: usize,
    /// Owning processing set
    pub pset: usize,
    /// Rank of the subband within its processing set
    pub slot_in_pset: usize,
    /// Owning beam
    pub beam: u32,
    /// Owning input channel index (payload source)
    pub channel: usize,
    /// Subband slot within the owning channel
    pub slot: usize,
    /// One record per input stream contributing to the owning beam
    pub records: Vec<MetadataRecord>,
}

/// Coordinator output for one integration period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// Period sequence number (monotonically increasing)
    pub period_index: u64,

    /// Start time of the period
    pub start: SampleTime,

    /// Flagged (missing or invalidated) samples per stream in this period
    pub flagged_samples: HashMap<StreamId, u64>,

    /// Subbands successfully dispatched
    pub dispatched_subbands: u32,

    /// Subbands skipped after a link failure
    pub skipped_subbands: u32,

    /// Subbands that needed a retry before succeeding
    pub retried_subbands: u32,

    /// Wall-clock time spent in the dispatch phase
    pub dispatch_duration: Duration,
}

impl PeriodSummary {
    /// Total flagged samples across all streams.
    pub fn total_flagged(&self) -> u64 {
        self.flagged_samples.values().sum()
    }

    /// Whether any stream contributed flags this period.
    pub fn has_flags(&self) -> bool {
        self.flagged_samples.values().any(|&n| n > 0)
    }
}
