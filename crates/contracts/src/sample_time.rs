//! SampleTime - integral time coordinate counted in samples.
//!
//! All pipeline timestamps are sample counts at the process-wide sample rate;
//! `SampleClock` converts between seconds and samples at that rate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::Duration;

/// Time coordinate in units of samples.
///
/// An opaque wrapper over a 64-bit signed sample count. Two instances are
/// comparable, and an instance can be offset by an integer sample count.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SampleTime(i64);

impl SampleTime {
    /// Create a SampleTime from a raw sample count.
    #[inline]
    pub const fn new(count: i64) -> Self {
        Self(count)
    }

    /// The raw sample count.
    #[inline]
    pub const fn count(self) -> i64 {
        self.0
    }
}

impl Add<i64> for SampleTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: i64) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub<i64> for SampleTime {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: i64) -> Self {
        Self(self.0 - rhs)
    }
}

impl AddAssign<i64> for SampleTime {
    #[inline]
    fn add_assign(&mut self, rhs: i64) {
        self.0 += rhs;
    }
}

impl SubAssign<i64> for SampleTime {
    #[inline]
    fn sub_assign(&mut self, rhs: i64) {
        self.0 -= rhs;
    }
}

impl Sub for SampleTime {
    type Output = i64;

    /// Distance between two times, in samples.
    #[inline]
    fn sub(self, rhs: Self) -> i64 {
        self.0 - rhs.0
    }
}

impl From<i64> for SampleTime {
    #[inline]
    fn from(count: i64) -> Self {
        Self(count)
    }
}

impl fmt::Display for SampleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide sample clock.
///
/// Holds the fixed sample rate and converts between wall-clock seconds and
/// sample counts. Created once at startup from the observation blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleClock {
    sample_rate: u64,
}

impl SampleClock {
    /// Create a clock at the given sample rate (samples per second).
    pub const fn new(sample_rate: u64) -> Self {
        Self { sample_rate }
    }

    /// The fixed sample rate in samples per second.
    #[inline]
    pub const fn sample_rate(&self) -> u64 {
        self.sample_rate
    }

    /// Convert seconds to a sample count. Ties round away from zero.
    #[inline]
    pub fn seconds_to_samples(&self, seconds: f64) -> i64 {
        (seconds * self.sample_rate as f64).round() as i64
    }

    /// Convert a sample count to seconds.
    #[inline]
    pub fn samples_to_seconds(&self, samples: i64) -> f64 {
        samples as f64 / self.sample_rate as f64
    }

    /// Convert a non-negative sample count to a wall-clock duration.
    #[inline]
    pub fn samples_to_duration(&self, samples: u64) -> Duration {
        Duration::from_secs_f64(samples as f64 / self.sample_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_distance() {
        let t = SampleTime::new(1000);
        assert_eq!((t + 24).count(), 1024);
        assert_eq!((t - 24).count(), 976);
        assert_eq!((t + 24) - t, 24);
        assert!(t < t + 1);
    }

    #[test]
    fn test_assign_ops() {
        let mut t = SampleTime::new(0);
        t += 100;
        t -= 25;
        assert_eq!(t.count(), 75);
    }

    #[test]
    fn test_seconds_round_trip() {
        let clock = SampleClock::new(1000);
        assert_eq!(clock.seconds_to_samples(0.25), 250);
        assert_eq!(clock.samples_to_seconds(250), 0.25);
    }

    #[test]
    fn test_tie_rounds_away_from_zero() {
        let clock = SampleClock::new(1000);
        assert_eq!(clock.seconds_to_samples(0.0005), 1);
        assert_eq!(clock.seconds_to_samples(-0.0005), -1);
    }

    #[test]
    fn test_serde_transparent() {
        let t = SampleTime::new(42);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "42");
        let back: SampleTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
