//! Simulation time management
//!
//! The staffing models work in minutes, while the clock itself counts whole
//! nanoseconds so that event ordering never depends on floating point
//! comparisons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;
const NANOS_PER_MINUTE: f64 = 60.0 * NANOS_PER_SECOND;

/// Simulation time with nanosecond precision
///
/// SimTime represents a point in simulation time, stored as nanoseconds since
/// the simulation start. It is also used for relative delays when scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// The simulation start (time zero)
    pub const fn zero() -> Self {
        SimTime(0)
    }

    pub const fn from_nanos(nanos: u64) -> Self {
        SimTime(nanos)
    }

    pub const fn from_millis(millis: u64) -> Self {
        SimTime(millis * 1_000_000)
    }

    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs * 1_000_000_000)
    }

    /// Create a SimTime from a Duration
    pub fn from_duration(duration: Duration) -> Self {
        SimTime(duration.as_nanos().min(u64::MAX as u128) as u64)
    }

    /// Create a SimTime from fractional minutes.
    ///
    /// Negative and NaN inputs map to zero and values beyond the representable
    /// range saturate, so sampled durations can never produce an invalid time.
    pub fn from_minutes(minutes: f64) -> Self {
        if minutes.is_nan() || minutes <= 0.0 {
            return SimTime::zero();
        }
        let nanos = minutes * NANOS_PER_MINUTE;
        if nanos >= u64::MAX as f64 {
            SimTime(u64::MAX)
        } else {
            SimTime(nanos.round() as u64)
        }
    }

    /// Create a SimTime from fractional seconds, with the same saturation as
    /// [`SimTime::from_minutes`].
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::from_minutes(secs / 60.0)
    }

    /// Convert SimTime to a Duration
    pub fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.0)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / NANOS_PER_SECOND
    }

    pub fn as_minutes(&self) -> f64 {
        self.0 as f64 / NANOS_PER_MINUTE
    }

    /// Calculate the duration since another SimTime (zero if `earlier` is later)
    pub fn duration_since(&self, earlier: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(earlier.0))
    }
}

impl Add<SimTime> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> Self::Output {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        self + SimTime::from_duration(rhs)
    }
}

impl Sub<SimTime> for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.duration_since(rhs)
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::zero()
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.as_secs_f64();
        if secs >= 60.0 {
            write!(f, "{:.3}min", self.as_minutes())
        } else if secs >= 1.0 {
            write!(f, "{secs:.3}s")
        } else {
            write!(f, "{:.3}ms", secs * 1000.0)
        }
    }
}
