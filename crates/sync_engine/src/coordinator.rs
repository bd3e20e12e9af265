//! IngestCoordinator - the periodic driver.
//!
//! One iteration per integration period:
//! ComputingDelays -> ReadingWindows -> BuildingMetadata -> Dispatching ->
//! Advancing, looping until shutdown. Per-channel gaps are data carried in
//! metadata; the only fatal conditions are inconsistent configuration
//! (checked before the loop) and, policy permitting, dispatch transport
//! failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use contracts::{
    ContractError, DispatchFailurePolicy, DispatchUnit, MetadataRecord, PeriodSummary, SampleTime,
};
use dispatcher::Dispatcher;
use ingestion::InputChannel;

use crate::delay::DelayTracker;

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoordinatorState {
    /// Before the first period
    Idle,
    /// Resolving per-beam delay corrections
    ComputingDelays,
    /// Opening read transactions and extracting gaps
    ReadingWindows,
    /// Assembling dispatch units
    BuildingMetadata,
    /// Driving the dispatcher
    Dispatching,
    /// Closing transactions and moving to the next period
    Advancing,
}

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Start time of the first period
    pub start: SampleTime,
    /// Integration period length in samples
    pub period_samples: usize,
    /// History samples included in every read window
    pub history_samples: usize,
    /// Flag ranges kept per metadata record
    pub max_flag_ranges: usize,
    /// Subbands per processing set
    pub subbands_per_pset: usize,
    /// Number of processing sets
    pub pset_count: usize,
    /// Policy for dispatch transport failures
    pub dispatch_failure: DispatchFailurePolicy,
}

/// One input channel with its owning beam.
pub struct ChannelBinding {
    /// The channel itself
    pub channel: Arc<InputChannel>,
    /// Owning beam id
    pub beam: u32,
}

/// The periodic driver: realigns all channels onto the delay-corrected
/// common time axis and fans each period out through the dispatcher.
pub struct IngestCoordinator {
    config: CoordinatorConfig,
    channels: Vec<ChannelBinding>,
    /// Ordered beam ids; position = beam index into the delay tracker.
    beam_ids: Vec<u32>,
    /// Beam index per channel.
    channel_beam_index: Vec<usize>,
    /// Global subband -> (owning channel, slot within channel).
    subband_map: Vec<(usize, usize)>,
    delays: DelayTracker,
    dispatcher: Dispatcher,
    stop: Arc<AtomicBool>,
    state: CoordinatorState,
    period_start: SampleTime,
    period_index: u64,
}

impl IngestCoordinator {
    /// Build a coordinator, checking configuration consistency.
    ///
    /// # Errors
    /// Mismatched beam/channel/subband counts are fatal here, before any
    /// period runs.
    pub fn new(
        config: CoordinatorConfig,
        channels: Vec<ChannelBinding>,
        delays: DelayTracker,
        dispatcher: Dispatcher,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, ContractError> {
        if channels.is_empty() {
            return Err(ContractError::config_validation(
                "channels",
                "at least one input channel is required",
            ));
        }

        let total_subbands: usize = channels.iter().map(|b| b.channel.subbands()).sum();
        let expected = config.pset_count * config.subbands_per_pset;
        if total_subbands != expected {
            return Err(ContractError::config_validation(
                "channels / psets",
                format!("channels carry {total_subbands} subbands, psets expect {expected}"),
            ));
        }

        let mut beam_ids: Vec<u32> = channels.iter().map(|b| b.beam).collect();
        beam_ids.sort_unstable();
        beam_ids.dedup();
        if beam_ids.len() != delays.beam_count() {
            return Err(ContractError::config_validation(
                "beams",
                format!(
                    "channels reference {} beams, delay tracker covers {}",
                    beam_ids.len(),
                    delays.beam_count()
                ),
            ));
        }

        let channel_beam_index = channels
            .iter()
            .map(|b| beam_ids.binary_search(&b.beam).expect("beam id present"))
            .collect();

        let mut subband_map = Vec::with_capacity(total_subbands);
        for (channel, binding) in channels.iter().enumerate() {
            for slot in 0..binding.channel.subbands() {
                subband_map.push((channel, slot));
            }
        }

        let period_start = config.start;
        Ok(Self {
            config,
            channels,
            beam_ids,
            channel_beam_index,
            subband_map,
            delays,
            dispatcher,
            stop,
            state: CoordinatorState::Idle,
            period_start,
            period_index: 0,
        })
    }

    /// Start time of the next period to run.
    pub fn period_start(&self) -> SampleTime {
        self.period_start
    }

    /// Index of the next period to run.
    pub fn period_index(&self) -> u64 {
        self.period_index
    }

    /// Run periods until shutdown or `max_periods`, reporting each period's
    /// summary to `on_period`. Returns the number of periods completed.
    #[instrument(name = "coordinator_run", skip_all, fields(max_periods = ?max_periods))]
    pub fn run(
        &mut self,
        max_periods: Option<u64>,
        mut on_period: impl FnMut(&PeriodSummary),
    ) -> Result<u64, ContractError> {
        let mut completed = 0u64;

        info!(
            start = %self.period_start,
            period = self.config.period_samples,
            channels = self.channels.len(),
            "coordinator entering period loop"
        );

        while !self.stop.load(Ordering::SeqCst) {
            if max_periods.is_some_and(|max| completed >= max) {
                break;
            }
            let summary = self.run_period().map_err(|e| {
                tracing::error!(
                    period = self.period_index,
                    state = ?self.state,
                    error = %e,
                    "period failed"
                );
                e
            })?;
            on_period(&summary);
            completed += 1;
        }

        self.state = CoordinatorState::Idle;
        info!(periods = completed, "coordinator loop finished");
        Ok(completed)
    }

    /// Drive exactly one integration period.
    pub fn run_period(&mut self) -> Result<PeriodSummary, ContractError> {
        let window_len = self.config.period_samples + self.config.history_samples;

        self.state = CoordinatorState::ComputingDelays;
        let delays = self.delays.advance(self.period_start)?;

        self.state = CoordinatorState::ReadingWindows;
        let mut windows = Vec::with_capacity(self.channels.len());
        let mut window_flags = Vec::with_capacity(self.channels.len());
        let mut flagged_samples = Vec::with_capacity(self.channels.len());
        for (channel, binding) in self.channels.iter().enumerate() {
            let shift = delays[self.channel_beam_index[channel]].coarse_shift;
            let from = self.period_start + shift;
            let window = binding.channel.begin_read(from, window_len)?;

            // Extract and bound this channel's gaps right away; payload
            // copies later consult the live invalidation state themselves.
            let local = window.local_gaps();
            flagged_samples.push(local.covered_samples() as u64);
            let mut bounded = local;
            bounded.bound(self.config.max_flag_ranges);
            window_flags.push(bounded);
            windows.push(window);
        }

        self.state = CoordinatorState::BuildingMetadata;
        let mut units = Vec::with_capacity(self.subband_map.len());
        for (subband, &(channel, slot)) in self.subband_map.iter().enumerate() {
            let beam = self.channels[channel].beam;
            let beam_index = self.channel_beam_index[channel];

            let records: Vec<MetadataRecord> = self
                .channels
                .iter()
                .enumerate()
                .filter(|(_, b)| b.beam == beam)
                .map(|(stream, _)| MetadataRecord {
                    stream: stream as u16,
                    alignment_shift: delays[beam_index].coarse_shift,
                    delay: delays[beam_index],
                    flags: window_flags[stream].clone(),
                })
                .collect();

            units.push(DispatchUnit {
                subband,
                pset: subband / self.config.subbands_per_pset,
                slot_in_pset: subband % self.config.subbands_per_pset,
                beam,
                channel,
                slot,
                records,
            });
        }

        self.state = CoordinatorState::Dispatching;
        let dispatch_started = Instant::now();
        self.dispatcher.begin_period(self.period_index);

        let mut dispatched = 0u32;
        let mut skipped = 0u32;
        let mut retried = 0u32;
        for unit in &units {
            let window = &windows[unit.channel];
            let result = self.dispatcher.send_subband(self.period_index, unit, window);
            match result {
                Ok(()) => dispatched += 1,
                Err(e) => match self.config.dispatch_failure {
                    DispatchFailurePolicy::Fatal => return Err(e),
                    DispatchFailurePolicy::Retry => {
                        warn!(
                            subband = unit.subband,
                            error = %e,
                            "dispatch failed, retrying once"
                        );
                        match self.dispatcher.send_subband(self.period_index, unit, window) {
                            Ok(()) => {
                                retried += 1;
                                dispatched += 1;
                            }
                            Err(e) => {
                                warn!(subband = unit.subband, error = %e, "retry failed, skipping");
                                skipped += 1;
                            }
                        }
                    }
                    DispatchFailurePolicy::Skip => {
                        warn!(subband = unit.subband, error = %e, "dispatch failed, skipping");
                        skipped += 1;
                    }
                },
            }
            self.dispatcher.advance(unit.pset);
        }
        let dispatch_duration = dispatch_started.elapsed();

        self.state = CoordinatorState::Advancing;
        drop(windows);

        let summary = PeriodSummary {
            period_index: self.period_index,
            start: self.period_start,
            flagged_samples: self
                .channels
                .iter()
                .zip(&flagged_samples)
                .map(|(b, &n)| (b.channel.stream().clone(), n))
                .collect(),
            dispatched_subbands: dispatched,
            skipped_subbands: skipped,
            retried_subbands: retried,
            dispatch_duration,
        };

        metrics::counter!("sync_periods_total").increment(1);
        metrics::histogram!("sync_flagged_samples").record(summary.total_flagged() as f64);
        metrics::histogram!("sync_dispatch_ms").record(dispatch_duration.as_secs_f64() * 1000.0);
        if skipped > 0 {
            metrics::counter!("sync_subbands_skipped_total").increment(skipped as u64);
        }

        debug!(
            period = self.period_index,
            start = %self.period_start,
            flagged = summary.total_flagged(),
            dispatched,
            skipped,
            "period complete"
        );

        self.period_start += self.config.period_samples as i64;
        self.period_index += 1;

        Ok(summary)
    }

    /// Ordered beam ids the delay tracker is indexed by.
    pub fn beam_ids(&self) -> &[u32] {
        &self.beam_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::FixedDelayOracle;
    use contracts::{DelaySign, Sample, SampleClock, WorkerLink};
    use dispatcher::links::RecordingLink;
    use dispatcher::DispatcherConfig;
    use ingestion::{ChannelConfig, InputChannel};
    use std::time::Duration;

    fn make_channel(stream: &str, subbands: usize) -> Arc<InputChannel> {
        Arc::new(
            InputChannel::new(ChannelConfig {
                stream: stream.into(),
                subbands,
                capacity: 512,
                history: 0,
                realtime: false,
                max_wait: Duration::from_millis(10),
            })
            .unwrap(),
        )
    }

    fn fill_channel(channel: &InputChannel, from: i64, to: i64) {
        let subbands = channel.subbands();
        let n = (to - from) as usize;
        let mut block = Vec::with_capacity(subbands * n);
        for s in 0..subbands {
            for i in 0..n {
                block.push(Sample::new(s as i16, (from + i as i64) as i16));
            }
        }
        channel.append(SampleTime::new(from), &block, n);
    }

    fn make_coordinator(
        bindings: Vec<ChannelBinding>,
        beams: usize,
        pset_count: usize,
        subbands_per_pset: usize,
    ) -> Result<IngestCoordinator, ContractError> {
        let tracker = DelayTracker::new(
            Box::new(FixedDelayOracle::zero(beams)),
            SampleClock::new(1000),
            DelaySign::Positive,
            beams,
            4,
            100,
        );
        let workers: Vec<Box<dyn WorkerLink>> = (0..pset_count)
            .map(|i| {
                let (link, _) = RecordingLink::new(&format!("w{i}"));
                Box::new(link) as Box<dyn WorkerLink>
            })
            .collect();
        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                pset_count,
                workers_per_pset: 1,
                max_flag_ranges: 16,
            },
            workers,
        )
        .map_err(|e| ContractError::Other(e.to_string()))?;

        IngestCoordinator::new(
            CoordinatorConfig {
                start: SampleTime::new(0),
                period_samples: 100,
                history_samples: 0,
                max_flag_ranges: 16,
                subbands_per_pset,
                pset_count,
                dispatch_failure: DispatchFailurePolicy::Fatal,
            },
            bindings,
            tracker,
            dispatcher,
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn test_subband_count_mismatch_is_fatal() {
        let bindings = vec![ChannelBinding {
            channel: make_channel("rsp0", 3),
            beam: 0,
        }];
        let result = make_coordinator(bindings, 1, 2, 2);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_beam_count_mismatch_is_fatal() {
        let bindings = vec![
            ChannelBinding {
                channel: make_channel("rsp0", 1),
                beam: 0,
            },
            ChannelBinding {
                channel: make_channel("rsp1", 1),
                beam: 5,
            },
        ];
        // Tracker only covers one beam.
        let result = make_coordinator(bindings, 1, 2, 1);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_one_period_reports_gaps_per_stream() {
        let chan0 = make_channel("rsp0", 1);
        let chan1 = make_channel("rsp1", 1);
        fill_channel(&chan0, 0, 100);
        fill_channel(&chan1, 0, 40);
        fill_channel(&chan1, 60, 100);

        let bindings = vec![
            ChannelBinding {
                channel: Arc::clone(&chan0),
                beam: 0,
            },
            ChannelBinding {
                channel: Arc::clone(&chan1),
                beam: 1,
            },
        ];
        let mut coordinator = make_coordinator(bindings, 2, 2, 1).unwrap();

        let summary = coordinator.run_period().unwrap();
        assert_eq!(summary.period_index, 0);
        assert_eq!(summary.dispatched_subbands, 2);
        assert_eq!(summary.flagged_samples["rsp0"], 0);
        assert_eq!(summary.flagged_samples["rsp1"], 20);
        assert_eq!(coordinator.period_start(), SampleTime::new(100));
    }

    #[test]
    fn test_run_respects_max_periods() {
        let chan = make_channel("rsp0", 1);
        fill_channel(&chan, 0, 400);

        let bindings = vec![ChannelBinding {
            channel: Arc::clone(&chan),
            beam: 0,
        }];
        let mut coordinator = make_coordinator(bindings, 1, 1, 1).unwrap();

        let mut seen = Vec::new();
        let completed = coordinator
            .run(Some(3), |summary| seen.push(summary.period_index))
            .unwrap();
        assert_eq!(completed, 3);
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
