//! # Integration Tests
//!
//! Cross-crate end-to-end scenarios:
//! - one-period gap propagation from channel loss to worker metadata
//! - full capture-to-dispatch runs over generator sources
//! - deterministic subband-to-worker mapping across repeated runs

#[cfg(test)]
mod gap_scenario {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        DelaySign, DispatchFailurePolicy, GapRange, Sample, SampleClock, SampleTime, WorkerLink,
    };
    use dispatcher::links::{RecordingHandle, RecordingLink};
    use dispatcher::wire::{decode_begin_work, decode_metadata, decode_payload};
    use dispatcher::{Dispatcher, DispatcherConfig};
    use ingestion::{ChannelConfig, InputChannel};
    use sync_engine::{
        ChannelBinding, CoordinatorConfig, DelayTracker, FixedDelayOracle, IngestCoordinator,
    };

    fn make_channel(stream: &str) -> Arc<InputChannel> {
        Arc::new(
            InputChannel::new(ChannelConfig {
                stream: stream.into(),
                subbands: 1,
                capacity: 512,
                history: 0,
                realtime: false,
                max_wait: Duration::from_millis(10),
            })
            .unwrap(),
        )
    }

    fn append(channel: &InputChannel, from: i64, to: i64) {
        let n = (to - from) as usize;
        let block: Vec<Sample> = (0..n)
            .map(|i| Sample::new((from + i as i64) as i16, 1))
            .collect();
        channel.append(SampleTime::new(from), &block, n);
    }

    /// Two channels at sample rate 1000, period 100, no delay compensation.
    /// Channel 0 fully written for [0, 100); channel 1 missing [40, 60).
    /// One period must flag exactly [40, 60) on channel 1's beam and
    /// nothing on channel 0's.
    #[test]
    fn test_one_period_gap_propagates_to_metadata() {
        let chan0 = make_channel("rsp0");
        let chan1 = make_channel("rsp1");
        append(&chan0, 0, 100);
        append(&chan1, 0, 40);
        append(&chan1, 60, 100);

        let mut links: Vec<Box<dyn WorkerLink>> = Vec::new();
        let mut handles: Vec<RecordingHandle> = Vec::new();
        for i in 0..2 {
            let (link, handle) = RecordingLink::new(&format!("w{i}"));
            links.push(Box::new(link));
            handles.push(handle);
        }

        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                pset_count: 2,
                workers_per_pset: 1,
                max_flag_ranges: 16,
            },
            links,
        )
        .unwrap();

        let tracker = DelayTracker::new(
            Box::new(FixedDelayOracle::zero(2)),
            SampleClock::new(1000),
            DelaySign::Positive,
            2,
            8,
            100,
        );

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
        let mut coordinator = IngestCoordinator::new(
            CoordinatorConfig {
                start: SampleTime::new(0),
                period_samples: 100,
                history_samples: 0,
                max_flag_ranges: 16,
                subbands_per_pset: 1,
                pset_count: 2,
                dispatch_failure: DispatchFailurePolicy::Fatal,
            },
            bindings,
            tracker,
            dispatcher,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        let summary = coordinator.run_period().unwrap();
        assert_eq!(summary.dispatched_subbands, 2);
        assert_eq!(summary.flagged_samples["rsp0"], 0);
        assert_eq!(summary.flagged_samples["rsp1"], 20);

        // Worker 0 received subband 0 (channel 0): zero flag ranges.
        let bytes = handles[0].bytes();
        let (command, rest) = decode_begin_work(&bytes).unwrap();
        assert_eq!(command.subband, 0);
        assert_eq!(command.beam, 0);
        let (_, records, rest) = decode_metadata(rest).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].flags.is_empty());
        let (_, samples, _) = decode_payload(rest).unwrap();
        assert_eq!(samples.len(), 100);
        assert_eq!(samples[99], Sample::new(99, 1));

        // Worker 1 received subband 1 (channel 1): exactly one flag range
        // [40, 60), and the payload zeroed over it.
        let bytes = handles[1].bytes();
        let (command, rest) = decode_begin_work(&bytes).unwrap();
        assert_eq!(command.subband, 1);
        assert_eq!(command.beam, 1);
        let (_, records, rest) = decode_metadata(rest).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].flags.ranges(), &[GapRange::new(40, 60)]);
        let (_, samples, _) = decode_payload(rest).unwrap();
        assert_eq!(samples[39], Sample::new(39, 1));
        assert_eq!(samples[40], Sample::ZERO);
        assert_eq!(samples[59], Sample::ZERO);
        assert_eq!(samples[60], Sample::new(60, 1));
    }
}

#[cfg(test)]
mod e2e_pipeline {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        DelaySign, DispatchFailurePolicy, SampleClock, SampleTime, WorkerLink,
    };
    use dispatcher::links::{RecordingHandle, RecordingLink};
    use dispatcher::wire::{decode_begin_work, decode_metadata, decode_payload};
    use dispatcher::{Dispatcher, DispatcherConfig};
    use ingestion::sources::GeneratorSource;
    use ingestion::{CaptureMetrics, CaptureWorker, ChannelConfig, InputChannel, SchedulingPolicy};
    use sync_engine::{
        ChannelBinding, CoordinatorConfig, DelayTracker, FixedDelayOracle, IngestCoordinator,
        PeriodSummary,
    };

    const SAMPLES_PER_FRAME: u16 = 16;
    const FRAMES: u64 = 16; // 256 samples per stream
    const PERIOD: usize = 64;

    /// Run `periods` periods over two generator-driven streams (two
    /// subbands each, one shared beam) and return the per-worker byte
    /// streams plus the period summaries.
    fn run_pipeline(
        periods: u64,
        workers_per_pset: usize,
    ) -> (Vec<Vec<u8>>, Vec<PeriodSummary>) {
        let stop = Arc::new(AtomicBool::new(false));

        let mut channels = Vec::new();
        let mut capture_handles = Vec::new();
        for (index, stream) in ["rsp0", "rsp1"].iter().enumerate() {
            let channel = Arc::new(
                InputChannel::new(ChannelConfig {
                    stream: (*stream).into(),
                    subbands: 2,
                    capacity: 256,
                    history: 0,
                    realtime: false,
                    max_wait: Duration::from_millis(10),
                })
                .unwrap(),
            );
            let source = GeneratorSource::new(
                stream,
                2,
                SAMPLES_PER_FRAME,
                index as u64, // distinct seed per stream
                vec![],
                Some(FRAMES),
            );
            let worker = CaptureWorker::new(
                Box::new(source),
                Arc::clone(&channel),
                Arc::new(CaptureMetrics::new()),
                Arc::clone(&stop),
                SchedulingPolicy::Normal,
                SAMPLES_PER_FRAME,
            );
            capture_handles.push(worker.spawn().unwrap());
            channels.push(channel);
        }

        let worker_count = workers_per_pset; // single pset
        let mut links: Vec<Box<dyn WorkerLink>> = Vec::new();
        let mut handles: Vec<RecordingHandle> = Vec::new();
        for i in 0..worker_count {
            let (link, handle) = RecordingLink::new(&format!("w{i}"));
            links.push(Box::new(link));
            handles.push(handle);
        }
        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                pset_count: 1,
                workers_per_pset,
                max_flag_ranges: 16,
            },
            links,
        )
        .unwrap();

        let tracker = DelayTracker::new(
            Box::new(FixedDelayOracle::zero(1)),
            SampleClock::new(1000),
            DelaySign::Positive,
            1,
            8,
            PERIOD,
        );

        let bindings = channels
            .iter()
            .map(|channel| ChannelBinding {
                channel: Arc::clone(channel),
                beam: 0,
            })
            .collect();
        let mut coordinator = IngestCoordinator::new(
            CoordinatorConfig {
                start: SampleTime::new(0),
                period_samples: PERIOD,
                history_samples: 0,
                max_flag_ranges: 16,
                subbands_per_pset: 4,
                pset_count: 1,
                dispatch_failure: DispatchFailurePolicy::Fatal,
            },
            bindings,
            tracker,
            dispatcher,
            Arc::clone(&stop),
        )
        .unwrap();

        let mut summaries = Vec::new();
        let completed = coordinator
            .run(Some(periods), |summary| summaries.push(summary.clone()))
            .unwrap();
        assert_eq!(completed, periods);

        stop.store(true, std::sync::atomic::Ordering::SeqCst);
        for channel in &channels {
            channel.stop();
        }
        for handle in capture_handles {
            handle.join().unwrap();
        }

        (handles.iter().map(|h| h.bytes()).collect(), summaries)
    }

    #[test]
    fn test_capture_to_dispatch_clean_run() {
        let (streams, summaries) = run_pipeline(3, 2);

        // Every period dispatched all four subbands without flags.
        for summary in &summaries {
            assert_eq!(summary.dispatched_subbands, 4);
            assert_eq!(summary.skipped_subbands, 0);
            assert_eq!(summary.total_flagged(), 0);
        }

        // The aggregated view agrees.
        let mut aggregator = observability::PeriodMetricsAggregator::default();
        for summary in &summaries {
            aggregator.update(summary);
        }
        let aggregate = aggregator.summary();
        assert_eq!(aggregate.periods, 3);
        assert_eq!(aggregate.dispatched, 12);
        assert_eq!(aggregate.periods_with_flags, 0);

        // Check one stream end to end: decode all messages on worker 0 and
        // verify the payload matches the generator output exactly.
        let mut rest = streams[0].as_slice();
        let mut decoded = 0;
        while !rest.is_empty() {
            let (command, after) = decode_begin_work(rest).unwrap();
            let (_, records, after) = decode_metadata(after).unwrap();
            // Both streams share the beam, so both contribute records.
            assert_eq!(records.len(), 2);

            let (payload_subband, samples, after) = decode_payload(after).unwrap();
            assert_eq!(payload_subband, command.subband);
            assert_eq!(samples.len(), PERIOD);

            // Global subband s lives on channel s / 2 (seed = channel
            // index), slot s % 2.
            let seed = (command.subband / 2) as u64;
            let slot = (command.subband % 2) as usize;
            let window_start = command.period_index as i64 * PERIOD as i64;
            for (i, &sample) in samples.iter().enumerate() {
                let expected = GeneratorSource::sample_at(seed, slot, window_start + i as i64);
                assert_eq!(sample, expected, "subband {} sample {i}", command.subband);
            }

            decoded += 1;
            rest = after;
        }
        // 3 periods x 4 subbands over 2 workers = 6 subbands on worker 0.
        assert_eq!(decoded, 6);
    }

    #[test]
    fn test_dispatch_mapping_is_deterministic() {
        let (first, _) = run_pipeline(3, 2);
        let (second, _) = run_pipeline(3, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_cursor_rotates_with_period_index() {
        let (streams, _) = run_pipeline(2, 2);

        // Period 0 starts at worker 0, period 1 at worker 1. With 4
        // subbands and 2 workers: period 0 puts subbands 0,2 on w0;
        // period 1 puts subbands 1,3 on w0.
        let mut w0_subbands = Vec::new();
        let mut rest = streams[0].as_slice();
        while !rest.is_empty() {
            let (command, after) = decode_begin_work(rest).unwrap();
            let (_, _, after) = decode_metadata(after).unwrap();
            let (_, _, after) = decode_payload(after).unwrap();
            w0_subbands.push((command.period_index, command.subband));
            rest = after;
        }
        assert_eq!(
            w0_subbands,
            vec![(0, 0), (0, 2), (1, 1), (1, 3)]
        );
    }
}

#[cfg(test)]
mod config_round_trip {
    use config_loader::{ConfigFormat, ConfigLoader};

    const OBSERVATION_TOML: &str = r#"
[observation]
id = "B2026-08-07"
sample_rate = 195312
period_samples = 786432
history_samples = 16
max_network_delay_samples = 97656
subbands_per_pset = 61
pset_count = 4
workers_per_pset = 2

[[inputs]]
stream = "rsp0"
beam = 0
subbands = 122
samples_per_frame = 16
[inputs.source]
kind = "udp"
listen = "0.0.0.0:4346"

[[inputs]]
stream = "rsp1"
beam = 1
subbands = 122
samples_per_frame = 16
[inputs.source]
kind = "udp"
listen = "0.0.0.0:4347"

[[beams]]
id = 0
base_delay_seconds = 1.2e-5

[[beams]]
id = 1
base_delay_seconds = -3.0e-6
delay_rate = 1.0e-9

[[workers]]
pset = 0
[workers.link]
kind = "tcp"
addr = "10.0.1.1:5000"

[[workers]]
pset = 0
[workers.link]
kind = "tcp"
addr = "10.0.1.2:5000"

[[workers]]
pset = 1
[workers.link]
kind = "tcp"
addr = "10.0.1.3:5000"

[[workers]]
pset = 1
[workers.link]
kind = "tcp"
addr = "10.0.1.4:5000"

[[workers]]
pset = 2
[workers.link]
kind = "tcp"
addr = "10.0.1.5:5000"

[[workers]]
pset = 2
[workers.link]
kind = "tcp"
addr = "10.0.1.6:5000"

[[workers]]
pset = 3
[workers.link]
kind = "tcp"
addr = "10.0.1.7:5000"

[[workers]]
pset = 3
[workers.link]
kind = "tcp"
addr = "10.0.1.8:5000"
"#;

    #[test]
    fn test_realistic_observation_loads() {
        let blueprint = ConfigLoader::load_from_str(OBSERVATION_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.total_subbands(), 244);
        assert_eq!(blueprint.input_subbands(), 244);
        assert_eq!(blueprint.total_workers(), 8);
        assert_eq!(blueprint.beams[1].delay_rate, 1.0e-9);
        // Channel sizing absorbs the configured network jitter.
        assert!(blueprint.channel_capacity() > 786432 + 97656);
    }
}
