//! Pipeline orchestrator - wires channels, capture workers, the
//! coordinator and the dispatcher together for one observation run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use contracts::{
    FrameSource, ObservationBlueprint, SampleTime, SourceConfig, WorkerLink,
};
use dispatcher::{links, Dispatcher, DispatcherConfig};
use ingestion::sources::{GeneratorSource, UdpFrameSource};
use ingestion::{
    CaptureMetrics, CaptureWorker, ChannelConfig, InputChannel, SchedulingPolicy,
};
use observability::{record_capture_totals, record_period_metrics, PeriodMetricsAggregator};
use sync_engine::{
    ChannelBinding, CoordinatorConfig, DelayTracker, IngestCoordinator, LinearDriftOracle,
};

use super::PipelineStats;

/// FIFO priority applied to capture threads in realtime mode.
const CAPTURE_PRIORITY: i32 = 10;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The observation blueprint
    pub blueprint: ObservationBlueprint,

    /// Number of periods to run (None = until shutdown)
    pub max_periods: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion or shutdown.
    pub fn run(self, stop: Arc<AtomicBool>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let obs = &blueprint.observation;
        let clock = blueprint.clock();

        // Metrics endpoint (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Input channels and capture workers
        info!(inputs = blueprint.inputs.len(), "Setting up capture side...");
        let capacity = blueprint.channel_capacity();
        let max_wait = clock.samples_to_duration(obs.max_network_delay_samples as u64);

        let mut channels: Vec<Arc<InputChannel>> = Vec::with_capacity(blueprint.inputs.len());
        let mut capture_metrics: Vec<Arc<CaptureMetrics>> = Vec::new();
        let mut capture_handles: Vec<JoinHandle<()>> = Vec::new();

        for input in &blueprint.inputs {
            let channel = Arc::new(
                InputChannel::new(ChannelConfig {
                    stream: input.stream.clone(),
                    subbands: input.subbands,
                    capacity,
                    history: obs.history_samples,
                    realtime: obs.realtime,
                    max_wait,
                })
                .with_context(|| format!("channel for stream {}", input.stream))?,
            );

            let source: Box<dyn FrameSource> = match &input.source {
                SourceConfig::Udp { listen } => Box::new(
                    UdpFrameSource::bind(listen)
                        .with_context(|| format!("bind {listen} for stream {}", input.stream))?,
                ),
                SourceConfig::Generator {
                    seed,
                    drop_frames,
                    frames,
                } => Box::new(GeneratorSource::new(
                    &input.stream,
                    input.subbands as u16,
                    input.samples_per_frame,
                    *seed,
                    drop_frames.clone(),
                    *frames,
                )),
            };

            let scheduling = if obs.realtime {
                SchedulingPolicy::Realtime {
                    priority: CAPTURE_PRIORITY,
                }
            } else {
                SchedulingPolicy::Normal
            };

            let metrics = Arc::new(CaptureMetrics::new());
            let worker = CaptureWorker::new(
                source,
                Arc::clone(&channel),
                Arc::clone(&metrics),
                Arc::clone(&stop),
                scheduling,
                input.samples_per_frame,
            );
            capture_handles.push(
                worker
                    .spawn()
                    .with_context(|| format!("spawn capture worker for {}", input.stream))?,
            );

            channels.push(channel);
            capture_metrics.push(metrics);
        }

        // Worker links, pset-major
        info!(workers = blueprint.workers.len(), "Connecting worker links...");
        let mut link_boxes: Vec<Box<dyn WorkerLink>> = Vec::with_capacity(blueprint.workers.len());
        for pset in 0..obs.pset_count {
            for (index, worker) in blueprint
                .workers
                .iter()
                .enumerate()
                .filter(|(_, w)| w.pset == pset)
            {
                let name = format!("w{index}");
                link_boxes.push(links::connect(&name, &worker.link)?);
            }
        }
        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                pset_count: obs.pset_count,
                workers_per_pset: obs.workers_per_pset,
                max_flag_ranges: obs.max_flag_ranges,
            },
            link_boxes,
        )
        .context("Failed to create dispatcher")?;

        // Delay tracker over the ordered beam set
        let mut beam_ids: Vec<u32> = blueprint.inputs.iter().map(|i| i.beam).collect();
        beam_ids.sort_unstable();
        beam_ids.dedup();
        let mut params = Vec::with_capacity(beam_ids.len());
        for &id in &beam_ids {
            let beam = blueprint
                .beam(id)
                .ok_or_else(|| anyhow::anyhow!("beam {id} referenced by inputs is not defined"))?;
            params.push((beam.base_delay_seconds, beam.delay_rate));
        }
        let oracle = LinearDriftOracle::new(params, clock, obs.period_samples);
        let tracker = DelayTracker::new(
            Box::new(oracle),
            clock,
            obs.delay_sign,
            beam_ids.len(),
            obs.delay_batch_periods,
            obs.period_samples,
        );

        // Stop watcher: wakes blocked channel operations on shutdown.
        let watcher = {
            let channels: Vec<Arc<InputChannel>> = channels.clone();
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("stop-watcher".into())
                .spawn(move || loop {
                    if stop.load(Ordering::SeqCst) {
                        for channel in &channels {
                            channel.stop();
                        }
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(50));
                })
                .context("spawn stop watcher")?
        };

        // Align the first period on the streams' first timestamps.
        let start = match self.wait_for_start(&channels, &stop) {
            Some(start) => start,
            None => {
                info!("Shutdown before any data arrived");
                stop.store(true, Ordering::SeqCst);
                let _ = watcher.join();
                for handle in capture_handles {
                    let _ = handle.join();
                }
                return Ok(self.collect_stats(
                    start_time,
                    0,
                    &channels,
                    &capture_metrics,
                    PeriodMetricsAggregator::default(),
                ));
            }
        };
        info!(start = %start, "First period aligned");

        // Coordinator (runs on this thread)
        let bindings = channels
            .iter()
            .zip(&blueprint.inputs)
            .map(|(channel, input)| ChannelBinding {
                channel: Arc::clone(channel),
                beam: input.beam,
            })
            .collect();
        let mut coordinator = IngestCoordinator::new(
            CoordinatorConfig {
                start,
                period_samples: obs.period_samples,
                history_samples: obs.history_samples,
                max_flag_ranges: obs.max_flag_ranges,
                subbands_per_pset: obs.subbands_per_pset,
                pset_count: obs.pset_count,
                dispatch_failure: obs.dispatch_failure,
            },
            bindings,
            tracker,
            dispatcher,
            Arc::clone(&stop),
        )
        .context("Failed to create coordinator")?;

        let mut aggregator = PeriodMetricsAggregator::default();
        let periods = coordinator
            .run(self.config.max_periods, |summary| {
                record_period_metrics(summary);
                aggregator.update(summary);

                if summary.period_index % 100 == 0 {
                    info!(
                        period = summary.period_index,
                        flagged = summary.total_flagged(),
                        dispatched = summary.dispatched_subbands,
                        "period milestone"
                    );
                }
            })
            .context("Coordinator failed")?;

        // Shutdown
        info!("Shutting down pipeline...");
        stop.store(true, Ordering::SeqCst);
        let _ = watcher.join();
        for handle in capture_handles {
            if handle.join().is_err() {
                warn!("capture worker thread panicked");
            }
        }

        Ok(self.collect_stats(start_time, periods, &channels, &capture_metrics, aggregator))
    }

    /// Wait until every channel has seen data (or ended), returning the
    /// common start time: the latest first timestamp across live channels.
    fn wait_for_start(
        &self,
        channels: &[Arc<InputChannel>],
        stop: &AtomicBool,
    ) -> Option<SampleTime> {
        loop {
            if stop.load(Ordering::SeqCst) {
                return None;
            }

            let ready = channels
                .iter()
                .all(|c| c.first_timestamp().is_some() || c.is_ended());
            if ready {
                let start = channels
                    .iter()
                    .filter_map(|c| c.first_timestamp())
                    .max()
                    .unwrap_or(SampleTime::new(0));
                debug!(start = %start, "all input streams started");
                return Some(start);
            }

            std::thread::sleep(Duration::from_millis(20));
        }
    }

    fn collect_stats(
        &self,
        start_time: Instant,
        periods: u64,
        channels: &[Arc<InputChannel>],
        capture_metrics: &[Arc<CaptureMetrics>],
        aggregator: PeriodMetricsAggregator,
    ) -> PipelineStats {
        let capture = channels
            .iter()
            .zip(capture_metrics)
            .map(|(channel, metrics)| {
                let snapshot = metrics.snapshot();
                record_capture_totals(
                    channel.stream(),
                    snapshot.frames_received,
                    snapshot.frames_rejected,
                    snapshot.frames_late,
                );
                (channel.stream().to_string(), snapshot)
            })
            .collect();

        PipelineStats {
            periods,
            duration: start_time.elapsed(),
            active_streams: channels.len(),
            active_workers: self.config.blueprint.workers.len(),
            capture,
            sync_metrics: aggregator.summary(),
        }
    }
}
