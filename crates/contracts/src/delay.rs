//! Geometric-delay contracts: the oracle interface and per-period samples.
//!
//! The delay calculation itself is an external collaborator; the pipeline
//! only consumes its output. Delays arrive as real-valued seconds per beam,
//! evaluated at period boundaries, and are split into an integer coarse
//! sample shift (applied uniformly across the period by moving the read
//! window) and sub-sample fine residuals at the period's begin and end
//! (passed downstream for phase correction).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{SampleClock, SampleTime};

/// Accumulated propagation delay over one integration period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DelayWindow {
    /// Delay in seconds, valid at the period's begin.
    pub begin_seconds: f64,
    /// Delay in seconds, valid at the period's end.
    pub end_seconds: f64,
}

/// Per-beam delay correction for exactly one integration period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DelaySample {
    /// Whole-sample shift applied to the read window, sign convention applied.
    pub coarse_shift: i64,
    /// Sub-sample residual at the period's begin, in seconds.
    pub fine_begin_seconds: f64,
    /// Sub-sample residual at the period's end, in seconds.
    pub fine_end_seconds: f64,
}

/// Sign convention for applying the coarse shift to the read window.
///
/// The upstream delay model leaves the sign ambiguous, so it is a
/// configuration decision rather than a hardwired choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelaySign {
    /// Positive delay opens the read window later.
    #[default]
    Positive,
    /// Positive delay opens the read window earlier.
    Negative,
}

impl DelaySign {
    /// Apply the convention to a raw coarse shift.
    #[inline]
    pub fn apply(self, shift: i64) -> i64 {
        match self {
            DelaySign::Positive => shift,
            DelaySign::Negative => -shift,
        }
    }
}

impl DelaySample {
    /// Split a delay window into coarse and fine components.
    ///
    /// The coarse shift is the rounded mean of the begin/end delays in
    /// samples (ties away from zero); it is applied uniformly across the
    /// period while the per-endpoint residuals carry the sub-sample part.
    pub fn from_window(window: DelayWindow, clock: &SampleClock, sign: DelaySign) -> Self {
        let mean = (window.begin_seconds + window.end_seconds) / 2.0;
        let coarse = clock.seconds_to_samples(mean);
        let coarse_seconds = clock.samples_to_seconds(coarse);
        Self {
            coarse_shift: sign.apply(coarse),
            fine_begin_seconds: window.begin_seconds - coarse_seconds,
            fine_end_seconds: window.end_seconds - coarse_seconds,
        }
    }
}

/// Delay oracle failure.
#[derive(Debug, Error)]
pub enum DelayError {
    /// The oracle itself failed.
    #[error("delay oracle failed: {message}")]
    Oracle { message: String },

    /// The oracle returned a batch with the wrong beam count.
    #[error("delay batch has {got} beams, expected {expected}")]
    BeamCountMismatch { got: usize, expected: usize },

    /// The oracle returned a batch with the wrong period count.
    #[error("delay batch has {got} periods, expected {expected}")]
    PeriodCountMismatch { got: usize, expected: usize },
}

/// External delay calculation, queried in batches.
///
/// `times` are the start times of the next periods; the result is indexed
/// `[beam][period]`. The calculation may be expensive, which is why the
/// coordinator amortizes it over `delay_batch_periods` periods per call.
pub trait DelayOracle: Send {
    /// Compute per-beam delay windows for a batch of upcoming periods.
    fn compute_delays(&mut self, times: &[SampleTime]) -> Result<Vec<Vec<DelayWindow>>, DelayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coarse_is_rounded_mean() {
        let clock = SampleClock::new(1000);
        let window = DelayWindow {
            begin_seconds: 0.0101,
            end_seconds: 0.0105,
        };
        // mean 0.0103 s -> 10.3 samples -> 10
        let d = DelaySample::from_window(window, &clock, DelaySign::Positive);
        assert_eq!(d.coarse_shift, 10);
        assert!((d.fine_begin_seconds - 0.0001).abs() < 1e-12);
        assert!((d.fine_end_seconds - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn test_tie_rounds_away_from_zero() {
        let clock = SampleClock::new(1000);
        let window = DelayWindow {
            begin_seconds: 0.0105,
            end_seconds: 0.0105,
        };
        let d = DelaySample::from_window(window, &clock, DelaySign::Positive);
        assert_eq!(d.coarse_shift, 11);

        let neg = DelayWindow {
            begin_seconds: -0.0105,
            end_seconds: -0.0105,
        };
        let d = DelaySample::from_window(neg, &clock, DelaySign::Positive);
        assert_eq!(d.coarse_shift, -11);
    }

    #[test]
    fn test_sign_convention_flips_shift_only() {
        let clock = SampleClock::new(1000);
        let window = DelayWindow {
            begin_seconds: 0.0101,
            end_seconds: 0.0105,
        };
        let pos = DelaySample::from_window(window, &clock, DelaySign::Positive);
        let neg = DelaySample::from_window(window, &clock, DelaySign::Negative);
        assert_eq!(neg.coarse_shift, -pos.coarse_shift);
        assert_eq!(neg.fine_begin_seconds, pos.fine_begin_seconds);
        assert_eq!(neg.fine_end_seconds, pos.fine_end_seconds);
    }
}
