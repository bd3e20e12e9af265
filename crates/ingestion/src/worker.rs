//! CaptureWorker - one receive loop per physical input stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use contracts::{Frame, FrameSource, SourceError, FRAME_HEADER_BYTES, SAMPLE_BYTES};
use contracts::{Sample, StreamId};

use crate::channel::{AppendOutcome, InputChannel};
use crate::metrics::CaptureMetrics;
use crate::realtime::SchedulingPolicy;

/// Owns one frame source and appends its decoded samples into the owning
/// channel. Malformed frames are dropped and counted, never fatal; a
/// transport failure terminates this worker only, degrading its channel to
/// permanently gapped.
pub struct CaptureWorker {
    stream: StreamId,
    source: Box<dyn FrameSource>,
    channel: Arc<InputChannel>,
    metrics: Arc<CaptureMetrics>,
    stop: Arc<AtomicBool>,
    scheduling: SchedulingPolicy,
    samples_per_frame: u16,
}

impl CaptureWorker {
    /// Create a worker for one input stream.
    pub fn new(
        source: Box<dyn FrameSource>,
        channel: Arc<InputChannel>,
        metrics: Arc<CaptureMetrics>,
        stop: Arc<AtomicBool>,
        scheduling: SchedulingPolicy,
        samples_per_frame: u16,
    ) -> Self {
        Self {
            stream: channel.stream().clone(),
            source,
            channel,
            metrics,
            stop,
            scheduling,
            samples_per_frame,
        }
    }

    /// Spawn the worker on its own named OS thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        let name = format!("capture-{}", self.stream);
        thread::Builder::new().name(name).spawn(move || self.run())
    }

    /// Run the receive loop until stop or a transport failure.
    pub fn run(mut self) {
        if let Err(e) = self.scheduling.apply() {
            warn!(
                stream = %self.stream,
                error = %e,
                "could not apply realtime scheduling, continuing at normal priority"
            );
        }

        let subbands = self.channel.subbands();
        let samples = self.samples_per_frame as usize;
        let frame_bytes = FRAME_HEADER_BYTES + subbands * samples * SAMPLE_BYTES;
        let mut recv_buf = vec![0u8; frame_bytes];
        let mut scratch = vec![Sample::ZERO; subbands * samples];

        info!(
            stream = %self.stream,
            source = self.source.descriptor(),
            frame_bytes,
            "capture worker started"
        );

        loop {
            if self.stop.load(Ordering::SeqCst) {
                debug!(stream = %self.stream, "capture worker stopping");
                break;
            }

            match self.source.recv_frame(&mut recv_buf) {
                Ok(Some(len)) => self.handle_frame(&recv_buf[..len], &mut scratch),
                Ok(None) => continue,
                Err(SourceError::Closed { reason }) => {
                    info!(stream = %self.stream, reason, "frame source closed");
                    break;
                }
                Err(SourceError::Io(e)) => {
                    error!(
                        stream = %self.stream,
                        error = %e,
                        "capture transport failure, channel degrades to gapped"
                    );
                    break;
                }
            }
        }

        self.channel.mark_ended();
        let snapshot = self.metrics.snapshot();
        info!(
            stream = %self.stream,
            frames = snapshot.frames_received,
            rejected = snapshot.frames_rejected,
            late = snapshot.frames_late,
            "capture worker finished"
        );
    }

    fn handle_frame(&self, buf: &[u8], scratch: &mut [Sample]) {
        let subbands = self.channel.subbands() as u16;
        let frame = match Frame::decode(buf, subbands, self.samples_per_frame) {
            Ok(frame) => frame,
            Err(e) => {
                self.metrics.record_rejected();
                metrics::counter!("capture_frames_rejected", "stream" => self.stream.to_string())
                    .increment(1);
                warn!(stream = %self.stream, error = %e, "dropping malformed frame");
                return;
            }
        };

        // Receive buffers carry no alignment guarantee; stage the payload
        // bytes into the aligned scratch block before appending.
        bytemuck::cast_slice_mut::<Sample, u8>(scratch).copy_from_slice(frame.payload);

        let n = self.samples_per_frame as usize;
        match self.channel.append(frame.header.timestamp, scratch, n) {
            AppendOutcome::Written { samples } => {
                self.metrics.record_frame(samples as u64);
                metrics::counter!("capture_frames_received", "stream" => self.stream.to_string())
                    .increment(1);
            }
            AppendOutcome::TooLate => {
                self.metrics.record_late();
                metrics::counter!("capture_frames_late", "stream" => self.stream.to_string())
                    .increment(1);
                debug!(
                    stream = %self.stream,
                    timestamp = %frame.header.timestamp,
                    "frame behind retained span, dropped"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelConfig;
    use crate::sources::GeneratorSource;
    use contracts::SampleTime;
    use std::time::Duration;

    fn make_channel(subbands: usize) -> Arc<InputChannel> {
        Arc::new(
            InputChannel::new(ChannelConfig {
                stream: "rsp0".into(),
                subbands,
                capacity: 512,
                history: 0,
                realtime: false,
                max_wait: Duration::from_millis(10),
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_worker_fills_channel_from_generator() {
        let channel = make_channel(2);
        let metrics = Arc::new(CaptureMetrics::new());
        let stop = Arc::new(AtomicBool::new(false));

        // 8 frames of 16 samples = [0, 128)
        let source = GeneratorSource::new("rsp0", 2, 16, 0, vec![], Some(8));
        let worker = CaptureWorker::new(
            Box::new(source),
            Arc::clone(&channel),
            Arc::clone(&metrics),
            Arc::clone(&stop),
            SchedulingPolicy::Normal,
            16,
        );
        worker.run();

        assert_eq!(metrics.snapshot().frames_received, 8);
        assert!(channel.is_ended());

        let window = channel.begin_read(SampleTime::new(0), 128).unwrap();
        assert!(window.gaps().is_empty());
    }

    #[test]
    fn test_worker_counts_scripted_loss_as_gap() {
        let channel = make_channel(1);
        let metrics = Arc::new(CaptureMetrics::new());
        let stop = Arc::new(AtomicBool::new(false));

        // Frames 2 and 3 dropped: samples [32, 64) missing.
        let source = GeneratorSource::new("rsp0", 1, 16, 0, vec![2, 3], Some(8));
        let worker = CaptureWorker::new(
            Box::new(source),
            Arc::clone(&channel),
            Arc::clone(&metrics),
            stop,
            SchedulingPolicy::Normal,
            16,
        );
        worker.run();

        assert_eq!(metrics.snapshot().frames_received, 6);
        let window = channel.begin_read(SampleTime::new(0), 128).unwrap();
        assert_eq!(window.gaps().covered_samples(), 32);
    }
}
