//! Built-in delay oracles.
//!
//! The real geometric calculation is an external collaborator; these
//! implementations cover offline operation (linear drift from the
//! blueprint's beam parameters) and tests (fixed delays).

use contracts::{DelayError, DelayOracle, DelayWindow, SampleClock, SampleTime};

/// Oracle returning a constant delay per beam.
pub struct FixedDelayOracle {
    delays_seconds: Vec<f64>,
}

impl FixedDelayOracle {
    /// One constant delay per beam.
    pub fn new(delays_seconds: Vec<f64>) -> Self {
        Self { delays_seconds }
    }

    /// All beams at zero delay (no compensation).
    pub fn zero(beams: usize) -> Self {
        Self {
            delays_seconds: vec![0.0; beams],
        }
    }
}

impl DelayOracle for FixedDelayOracle {
    fn compute_delays(&mut self, times: &[SampleTime]) -> Result<Vec<Vec<DelayWindow>>, DelayError> {
        Ok(self
            .delays_seconds
            .iter()
            .map(|&delay| {
                times
                    .iter()
                    .map(|_| DelayWindow {
                        begin_seconds: delay,
                        end_seconds: delay,
                    })
                    .collect()
            })
            .collect())
    }
}

/// Oracle evaluating `base + rate * t` per beam.
pub struct LinearDriftOracle {
    /// (base_delay_seconds, delay_rate) per beam.
    params: Vec<(f64, f64)>,
    clock: SampleClock,
    period_samples: usize,
}

impl LinearDriftOracle {
    /// Linear delay model per beam.
    pub fn new(params: Vec<(f64, f64)>, clock: SampleClock, period_samples: usize) -> Self {
        Self {
            params,
            clock,
            period_samples,
        }
    }

    fn delay_at(&self, beam: usize, t: SampleTime) -> f64 {
        let (base, rate) = self.params[beam];
        base + rate * self.clock.samples_to_seconds(t.count())
    }
}

impl DelayOracle for LinearDriftOracle {
    fn compute_delays(&mut self, times: &[SampleTime]) -> Result<Vec<Vec<DelayWindow>>, DelayError> {
        let period = self.period_samples as i64;
        Ok((0..self.params.len())
            .map(|beam| {
                times
                    .iter()
                    .map(|&t| DelayWindow {
                        begin_seconds: self.delay_at(beam, t),
                        end_seconds: self.delay_at(beam, t + period),
                    })
                    .collect()
            })
            .collect())
    }
}
