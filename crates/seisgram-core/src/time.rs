//! Day-stride date ranges over UTC instants.

use chrono::{DateTime, Duration, Utc};

/// Length of one acquisition day in seconds.
pub const DAY_SECONDS: i64 = 86_400;

/// Half-open range `[start, end)` walked with a fixed one-day stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Create a range. `start >= end` is allowed and yields no days.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// First instant of the range.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end instant.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Stride between consecutive day starts.
    pub fn stride() -> Duration {
        Duration::seconds(DAY_SECONDS)
    }

    /// Number of day starts strictly before `end`.
    pub fn num_days(&self) -> usize {
        if self.start >= self.end {
            return 0;
        }
        let span = (self.end - self.start).num_seconds();
        (span + DAY_SECONDS - 1).div_euclid(DAY_SECONDS) as usize
    }

    /// Iterate the day starts.
    pub fn days(&self) -> Days {
        Days {
            next: self.start,
            end: self.end,
        }
    }
}

impl IntoIterator for DateRange {
    type Item = DateTime<Utc>;
    type IntoIter = Days;

    fn into_iter(self) -> Days {
        self.days()
    }
}

/// Iterator over day starts of a [`DateRange`].
#[derive(Debug, Clone)]
pub struct Days {
    next: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Iterator for Days {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let day = self.next;
        self.next = day + DateRange::stride();
        Some(day)
    }
}

/// Seconds between two instants, with sub-second precision.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 * 1e-6,
        None => delta.num_milliseconds() as f64 * 1e-3,
    }
}

/// Offset an instant by fractional seconds (microsecond resolution).
pub fn add_seconds(instant: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    instant + Duration::microseconds((seconds * 1e6).round() as i64)
}
