//! Simulated time.
//!
//! All timestamps and durations are `u64` picoseconds. Commands are issued on
//! clock edges, so most values produced by the scheduler are multiples of the
//! device clock period.

use serde::Serialize;

/// Simulated timestamp or duration in picoseconds.
pub type Time = u64;

/// Picoseconds per nanosecond.
pub const PS_PER_NS: Time = 1_000;

/// Converts whole nanoseconds to [`Time`].
pub const fn ns(value: u64) -> Time {
    value * PS_PER_NS
}

/// Converts fractional nanoseconds to [`Time`], rounding to the nearest picosecond.
pub fn ns_f64(value: f64) -> Time {
    (value * PS_PER_NS as f64).round().max(0.0) as Time
}

/// Converts a [`Time`] to nanoseconds for reporting.
pub fn to_ns(time: Time) -> f64 {
    time as f64 / PS_PER_NS as f64
}

/// Rounds `time` up to the next multiple of `period`.
///
/// A zero period leaves the value untouched.
pub fn align_up(time: Time, period: Time) -> Time {
    if period == 0 {
        return time;
    }
    match time % period {
        0 => time,
        rem => time.saturating_add(period - rem),
    }
}

/// A window of simulated time, `start` inclusive and `end` exclusive.
///
/// Used both for legality windows (earliest legal issue time, open-ended) and
/// for the span during which a column command occupies the data bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TimeInterval {
    /// First instant inside the window.
    pub start: Time,
    /// First instant after the window.
    pub end: Time,
}

impl TimeInterval {
    /// Creates a window from explicit bounds.
    pub const fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    /// Creates a window that starts at `start` and never closes.
    pub const fn from(start: Time) -> Self {
        Self {
            start,
            end: Time::MAX,
        }
    }

    /// Returns `true` if `time` lies inside the window.
    pub fn contains(&self, time: Time) -> bool {
        time >= self.start && time < self.end
    }

    /// Length of the window.
    pub fn duration(&self) -> Time {
        self.end.saturating_sub(self.start)
    }

    /// Shifts both bounds by `offset`.
    pub fn shifted(&self, offset: Time) -> Self {
        Self {
            start: self.start.saturating_add(offset),
            end: self.end.saturating_add(offset),
        }
    }
}
