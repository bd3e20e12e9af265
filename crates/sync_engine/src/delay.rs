//! DelayTracker - oracle batching and coarse/fine derivation.
//!
//! The oracle is expensive, so it is queried once per `batch_periods`
//! periods for a whole batch of upcoming period boundaries. Between
//! batch calls the tracker consumes one precomputed window per period.
//! Continuity across periods comes from carrying the previous period's
//! end delay forward as the next period's begin delay.

use tracing::debug;

use contracts::{
    DelayError, DelayOracle, DelaySample, DelaySign, DelayWindow, SampleClock, SampleTime,
};

/// Per-period delay state for all beams.
pub struct DelayTracker {
    oracle: Box<dyn DelayOracle>,
    clock: SampleClock,
    sign: DelaySign,
    beams: usize,
    batch_periods: usize,
    period_samples: usize,
    /// Current batch, indexed `[beam][period]`.
    batch: Vec<Vec<DelayWindow>>,
    /// Periods consumed from the current batch.
    consumed: usize,
    /// Previous period's end delay per beam.
    carried_end: Vec<Option<f64>>,
}

impl DelayTracker {
    /// Create a tracker over `beams` beams.
    pub fn new(
        oracle: Box<dyn DelayOracle>,
        clock: SampleClock,
        sign: DelaySign,
        beams: usize,
        batch_periods: usize,
        period_samples: usize,
    ) -> Self {
        Self {
            oracle,
            clock,
            sign,
            beams,
            batch_periods: batch_periods.max(1),
            period_samples,
            batch: Vec::new(),
            consumed: 0,
            carried_end: vec![None; beams],
        }
    }

    /// Number of beams tracked.
    pub fn beam_count(&self) -> usize {
        self.beams
    }

    /// Resolve the delay corrections for the period starting at
    /// `period_start`, refilling the batch from the oracle when exhausted.
    pub fn advance(&mut self, period_start: SampleTime) -> Result<Vec<DelaySample>, DelayError> {
        if self.batch.is_empty() || self.consumed >= self.batch_periods {
            self.refill(period_start)?;
        }

        let mut samples = Vec::with_capacity(self.beams);
        for beam in 0..self.beams {
            let window = self.batch[beam][self.consumed];
            // Roll the previous end forward as this period's begin.
            let begin_seconds = self.carried_end[beam].unwrap_or(window.begin_seconds);
            let end_seconds = window.end_seconds;
            self.carried_end[beam] = Some(end_seconds);

            samples.push(DelaySample::from_window(
                DelayWindow {
                    begin_seconds,
                    end_seconds,
                },
                &self.clock,
                self.sign,
            ));
        }
        self.consumed += 1;

        Ok(samples)
    }

    fn refill(&mut self, period_start: SampleTime) -> Result<(), DelayError> {
        let period = self.period_samples as i64;
        let times: Vec<SampleTime> = (0..self.batch_periods)
            .map(|k| period_start + k as i64 * period)
            .collect();

        debug!(
            from = %period_start,
            periods = self.batch_periods,
            "requesting delay batch"
        );

        let batch = self.oracle.compute_delays(&times)?;
        if batch.len() != self.beams {
            return Err(DelayError::BeamCountMismatch {
                got: batch.len(),
                expected: self.beams,
            });
        }
        for row in &batch {
            if row.len() != self.batch_periods {
                return Err(DelayError::PeriodCountMismatch {
                    got: row.len(),
                    expected: self.batch_periods,
                });
            }
        }

        self.batch = batch;
        self.consumed = 0;
        Ok(())
    }
}
