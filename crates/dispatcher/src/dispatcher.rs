//! Dispatcher - round-robin fan-out of subbands to worker links.

use bytes::BytesMut;
use std::sync::Arc;
use tracing::{debug, instrument};

use contracts::{ContractError, DispatchUnit, PayloadSource, Sample, WorkerLink};

use crate::error::DispatcherError;
use crate::metrics::{LinkMetrics, LinkSnapshot};
use crate::wire;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of processing sets
    pub pset_count: usize,
    /// Worker links per processing set
    pub workers_per_pset: usize,
    /// Flag-range slots per metadata record
    pub max_flag_ranges: usize,
}

struct LinkSlot {
    link: Box<dyn WorkerLink>,
    metrics: Arc<LinkMetrics>,
}

/// Streams subbands over a grid of worker links, grouped by processing set.
///
/// The per-pset cursor is reset to `period_index mod workers_per_pset` at
/// each period start, making the subband-to-worker mapping a pure function
/// of the period index and the fixed dispatch order.
pub struct Dispatcher {
    config: DispatcherConfig,
    links: Vec<LinkSlot>,
    cursors: Vec<usize>,
    scratch_samples: Vec<Sample>,
    scratch_bytes: BytesMut,
}

impl Dispatcher {
    /// Create a dispatcher over `links`, ordered pset-major: the links of
    /// pset 0 first, then pset 1, and so on.
    pub fn new(
        config: DispatcherConfig,
        links: Vec<Box<dyn WorkerLink>>,
    ) -> Result<Self, DispatcherError> {
        let expected = config.pset_count * config.workers_per_pset;
        if links.len() != expected {
            return Err(DispatcherError::LinkCount {
                expected,
                got: links.len(),
            });
        }

        let links = links
            .into_iter()
            .map(|link| LinkSlot {
                link,
                metrics: Arc::new(LinkMetrics::new()),
            })
            .collect();

        Ok(Self {
            cursors: vec![0; config.pset_count],
            config,
            links,
            scratch_samples: Vec::new(),
            scratch_bytes: BytesMut::new(),
        })
    }

    /// Reset the round-robin cursors for a new period.
    #[instrument(name = "dispatcher_begin_period", skip(self))]
    pub fn begin_period(&mut self, period_index: u64) {
        let start = (period_index % self.config.workers_per_pset as u64) as usize;
        for cursor in &mut self.cursors {
            *cursor = start;
        }
        debug!(period_index, cursor = start, "dispatch cursors reset");
    }

    /// Worker (global link index) the next subband of `pset` maps to.
    pub fn target_worker(&self, pset: usize) -> usize {
        pset * self.config.workers_per_pset + self.cursors[pset]
    }

    /// Advance `pset`'s cursor past the current worker.
    ///
    /// Called once per dispatched subband regardless of outcome, so the
    /// mapping stays positional and deterministic.
    pub fn advance(&mut self, pset: usize) {
        self.cursors[pset] = (self.cursors[pset] + 1) % self.config.workers_per_pset;
    }

    /// Stream one subband to the pset's current worker: begin-work command,
    /// metadata batch, then the payload from the open read window.
    ///
    /// Does not advance the cursor; the caller advances after deciding its
    /// failure policy, so a retry targets the same worker.
    pub fn send_subband(
        &mut self,
        period_index: u64,
        unit: &DispatchUnit,
        payload: &dyn PayloadSource,
    ) -> Result<(), ContractError> {
        let worker = self.target_worker(unit.pset);

        self.scratch_samples
            .resize(payload.window_len(), Sample::ZERO);
        payload.copy_subband(unit.slot, &mut self.scratch_samples);

        self.scratch_bytes.clear();
        wire::encode_begin_work(
            &mut self.scratch_bytes,
            period_index,
            unit.subband as u32,
            unit.beam,
        );
        wire::encode_metadata(
            &mut self.scratch_bytes,
            unit.subband as u32,
            &unit.records,
            self.config.max_flag_ranges,
        );
        wire::encode_payload(
            &mut self.scratch_bytes,
            unit.subband as u32,
            &self.scratch_samples,
        );

        let slot = &mut self.links[worker];
        let result = slot
            .link
            .send(&self.scratch_bytes)
            .and_then(|()| slot.link.flush());

        match result {
            Ok(()) => {
                slot.metrics.record_subband(self.scratch_bytes.len() as u64);
                metrics::counter!(
                    "dispatch_subbands_total",
                    "link" => slot.link.descriptor().to_string(),
                    "status" => "ok"
                )
                .increment(1);
                Ok(())
            }
            Err(e) => {
                slot.metrics.record_failure();
                metrics::counter!(
                    "dispatch_subbands_total",
                    "link" => slot.link.descriptor().to_string(),
                    "status" => "failure"
                )
                .increment(1);
                Err(e)
            }
        }
    }

    /// Per-link metrics snapshots.
    pub fn link_metrics(&self) -> Vec<(String, LinkSnapshot)> {
        self.links
            .iter()
            .map(|slot| (slot.link.descriptor().to_string(), slot.metrics.snapshot()))
            .collect()
    }
}
