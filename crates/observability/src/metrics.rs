//! Period metric collection.
//!
//! Records per-period facts from `PeriodSummary` into the metrics facade
//! and aggregates them in memory for the end-of-run summary.

use std::collections::HashMap;

use contracts::PeriodSummary;
use metrics::{counter, gauge, histogram};

/// Record metrics from one period's summary.
///
/// Called once per completed integration period.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_period_metrics;
///
/// coordinator.run(None, |summary| {
///     record_period_metrics(summary);
/// })?;
/// ```
pub fn record_period_metrics(summary: &PeriodSummary) {
    // Period counter and index (index gauge exposes skipped-period jumps)
    counter!("station_syncer_periods_total").increment(1);
    gauge!("station_syncer_last_period_index").set(summary.period_index as f64);

    // Dispatch outcome
    counter!("station_syncer_subbands_dispatched_total")
        .increment(summary.dispatched_subbands as u64);
    if summary.skipped_subbands > 0 {
        counter!("station_syncer_subbands_skipped_total").increment(summary.skipped_subbands as u64);
    }
    if summary.retried_subbands > 0 {
        counter!("station_syncer_subbands_retried_total").increment(summary.retried_subbands as u64);
    }

    // Dispatch latency
    histogram!("station_syncer_dispatch_ms").record(summary.dispatch_duration.as_secs_f64() * 1000.0);

    // Flagged samples
    let flagged = summary.total_flagged();
    gauge!("station_syncer_flagged_samples_current").set(flagged as f64);
    if flagged > 0 {
        counter!("station_syncer_flagged_samples_total").increment(flagged);
        counter!("station_syncer_periods_with_flags_total").increment(1);
    }
    for (stream, &samples) in &summary.flagged_samples {
        gauge!(
            "station_syncer_stream_flagged_samples",
            "stream" => stream.to_string()
        )
        .set(samples as f64);
        if samples > 0 {
            counter!(
                "station_syncer_stream_flagged_total",
                "stream" => stream.to_string()
            )
            .increment(samples);
        }
    }
}

/// Record end-of-run capture totals for one stream.
pub fn record_capture_totals(stream: &str, frames: u64, rejected: u64, late: u64) {
    gauge!("station_syncer_capture_frames", "stream" => stream.to_string()).set(frames as f64);
    gauge!("station_syncer_capture_rejected", "stream" => stream.to_string()).set(rejected as f64);
    gauge!("station_syncer_capture_late", "stream" => stream.to_string()).set(late as f64);
}

/// Running statistics over a scalar series.
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl RunningStats {
    /// Record one value.
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Number of recorded values.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of recorded values (0.0 when empty).
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Summary of the series.
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            mean: self.mean(),
            min: self.min.unwrap_or(0.0),
            max: self.max.unwrap_or(0.0),
        }
    }
}

/// Point-in-time statistics summary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    /// Values recorded
    pub count: u64,
    /// Mean value
    pub mean: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
}

/// In-memory aggregation of period summaries.
#[derive(Debug, Clone, Default)]
pub struct PeriodMetricsAggregator {
    /// Periods observed
    pub periods: u64,

    /// Periods that carried at least one flag range
    pub periods_with_flags: u64,

    /// Total flagged samples
    pub total_flagged: u64,

    /// Flagged samples per stream
    pub stream_flagged: HashMap<String, u64>,

    /// Subbands dispatched / skipped / retried
    pub dispatched: u64,
    /// Subbands skipped after link failures
    pub skipped: u64,
    /// Subbands needing one retry
    pub retried: u64,

    /// Dispatch duration series (milliseconds)
    pub dispatch_ms: RunningStats,
}

impl PeriodMetricsAggregator {
    /// Fold one period summary into the aggregate.
    pub fn update(&mut self, summary: &PeriodSummary) {
        self.periods += 1;
        if summary.has_flags() {
            self.periods_with_flags += 1;
        }
        self.total_flagged += summary.total_flagged();
        for (stream, &samples) in &summary.flagged_samples {
            *self.stream_flagged.entry(stream.to_string()).or_default() += samples;
        }
        self.dispatched += summary.dispatched_subbands as u64;
        self.skipped += summary.skipped_subbands as u64;
        self.retried += summary.retried_subbands as u64;
        self.dispatch_ms
            .record(summary.dispatch_duration.as_secs_f64() * 1000.0);
    }

    /// Summarize the aggregate.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            periods: self.periods,
            periods_with_flags: self.periods_with_flags,
            flag_rate: if self.periods > 0 {
                self.periods_with_flags as f64 / self.periods as f64 * 100.0
            } else {
                0.0
            },
            total_flagged: self.total_flagged,
            stream_flagged: self.stream_flagged.clone(),
            dispatched: self.dispatched,
            skipped: self.skipped,
            retried: self.retried,
            dispatch_ms: self.dispatch_ms.summary(),
        }
    }
}

/// Aggregated end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    /// Periods observed
    pub periods: u64,
    /// Periods that carried flags
    pub periods_with_flags: u64,
    /// Percentage of periods with flags
    pub flag_rate: f64,
    /// Total flagged samples
    pub total_flagged: u64,
    /// Flagged samples per stream
    pub stream_flagged: HashMap<String, u64>,
    /// Subbands dispatched
    pub dispatched: u64,
    /// Subbands skipped
    pub skipped: u64,
    /// Subbands retried
    pub retried: u64,
    /// Dispatch duration statistics (ms)
    pub dispatch_ms: StatsSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn make_summary(period: u64, flagged: u64) -> PeriodSummary {
        let mut flagged_samples = HashMap::new();
        flagged_samples.insert("rsp0".into(), flagged);
        PeriodSummary {
            period_index: period,
            start: contracts::SampleTime::new(period as i64 * 100),
            flagged_samples,
            dispatched_subbands: 4,
            skipped_subbands: 0,
            retried_subbands: 0,
            dispatch_duration: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_aggregator_folds_periods() {
        let mut agg = PeriodMetricsAggregator::default();
        agg.update(&make_summary(0, 0));
        agg.update(&make_summary(1, 20));

        let summary = agg.summary();
        assert_eq!(summary.periods, 2);
        assert_eq!(summary.periods_with_flags, 1);
        assert_eq!(summary.flag_rate, 50.0);
        assert_eq!(summary.total_flagged, 20);
        assert_eq!(summary.stream_flagged["rsp0"], 20);
        assert_eq!(summary.dispatched, 8);
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        stats.record(1.0);
        stats.record(3.0);
        let s = stats.summary();
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
    }
}
