//! Pipeline statistics.

use std::time::Duration;

use ingestion::CaptureSnapshot;
use observability::MetricsSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Integration periods completed
    pub periods: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of input streams captured
    pub active_streams: usize,

    /// Number of worker links driven
    pub active_workers: usize,

    /// Final capture counters per stream
    pub capture: Vec<(String, CaptureSnapshot)>,

    /// Aggregated period metrics
    pub sync_metrics: MetricsSummary,
}

impl PipelineStats {
    /// Periods completed per second of wall-clock time
    pub fn periods_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.periods as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Periods: {}", self.periods);
        println!("  Periods/s: {:.2}", self.periods_per_second());
        println!("  Input streams: {}", self.active_streams);
        println!("  Worker links: {}", self.active_workers);

        println!("\nDispatch");
        println!("  Subbands dispatched: {}", self.sync_metrics.dispatched);
        println!("  Subbands skipped: {}", self.sync_metrics.skipped);
        println!("  Subbands retried: {}", self.sync_metrics.retried);
        println!(
            "  Dispatch time (ms): mean {:.3}, min {:.3}, max {:.3}",
            self.sync_metrics.dispatch_ms.mean,
            self.sync_metrics.dispatch_ms.min,
            self.sync_metrics.dispatch_ms.max
        );

        println!("\nData quality");
        println!(
            "  Periods with flags: {} ({:.2}%)",
            self.sync_metrics.periods_with_flags, self.sync_metrics.flag_rate
        );
        println!("  Flagged samples: {}", self.sync_metrics.total_flagged);

        if !self.capture.is_empty() {
            println!("\nCapture");
            for (stream, snapshot) in &self.capture {
                println!(
                    "  {}: {} frames, {} rejected, {} late",
                    stream, snapshot.frames_received, snapshot.frames_rejected, snapshot.frames_late
                );
            }
        }

        println!();
    }
}
