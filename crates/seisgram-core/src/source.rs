//! Acquisition seam: where day chunks come from.
//!
//! Implementations live in `seisgram-io` (FDSN web service, local archive);
//! tests supply synthetic sources.

use crate::time::add_seconds;
use crate::trace::{StreamId, WaveformChunk};
use chrono::{DateTime, Utc};

/// One day's fetch request.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformRequest {
    /// Requested stream; location and network may be wildcards.
    pub stream: StreamId,
    /// Nominal window start.
    pub start: DateTime<Utc>,
    /// Nominal window end.
    pub end: DateTime<Utc>,
    /// Symmetric padding in seconds added on both sides of the window.
    pub buffer_secs: f64,
}

impl WaveformRequest {
    /// Request for `[start, end)` without padding.
    pub fn new(stream: StreamId, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            stream,
            start,
            end,
            buffer_secs: 0.0,
        }
    }

    /// Set the symmetric buffer.
    pub fn with_buffer(mut self, buffer_secs: f64) -> Self {
        self.buffer_secs = buffer_secs.max(0.0);
        self
    }

    /// Window start including the buffer.
    pub fn padded_start(&self) -> DateTime<Utc> {
        add_seconds(self.start, -self.buffer_secs)
    }

    /// Window end including the buffer.
    pub fn padded_end(&self) -> DateTime<Utc> {
        add_seconds(self.end, self.buffer_secs)
    }
}

/// Outcome of a fetch. Absence of data is an expected result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    /// Samples were retrieved.
    Available(WaveformChunk),
    /// Nothing usable for this window.
    Unavailable {
        /// Human-readable cause (no data, timeout, decode failure, ...).
        reason: String,
    },
}

impl Acquisition {
    /// Shorthand for an unavailable outcome.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Acquisition::Unavailable {
            reason: reason.into(),
        }
    }

    /// True if samples were retrieved.
    pub fn is_available(&self) -> bool {
        matches!(self, Acquisition::Available(_))
    }
}

/// Anything that can deliver a day of waveform data.
///
/// Implementations must turn ordinary absence (no data, timeouts, transport
/// errors) into [`Acquisition::Unavailable`] and must not mutate local state.
pub trait WaveformSource {
    /// Fetch samples for the request window.
    fn fetch(&self, request: &WaveformRequest) -> Acquisition;

    /// Short label for logs.
    fn describe(&self) -> String {
        String::from("waveform source")
    }
}

impl<S: WaveformSource + ?Sized> WaveformSource for &S {
    fn fetch(&self, request: &WaveformRequest) -> Acquisition {
        (**self).fetch(request)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: WaveformSource + ?Sized> WaveformSource for Box<S> {
    fn fetch(&self, request: &WaveformRequest) -> Acquisition {
        (**self).fetch(request)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::seconds_between;
    use chrono::TimeZone;

    #[test]
    fn padded_window() {
        let start = Utc.with_ymd_and_hms(2021, 6, 24, 0, 0, 0).unwrap();
        let end = start + chrono::Duration::days(1);
        let request = WaveformRequest::new(StreamId::new("9F", "HOPS", "*", "HHE"), start, end)
            .with_buffer(4320.0);

        assert!((seconds_between(request.padded_start(), start) - 4320.0).abs() < 1e-6);
        assert!((seconds_between(end, request.padded_end()) - 4320.0).abs() < 1e-6);
    }

    #[test]
    fn negative_buffer_is_clamped() {
        let start = Utc.with_ymd_and_hms(2021, 6, 24, 0, 0, 0).unwrap();
        let request = WaveformRequest::new(StreamId::new("9F", "HOPS", "*", "HHE"), start, start)
            .with_buffer(-5.0);
        assert_eq!(request.buffer_secs, 0.0);
    }

    #[test]
    fn boxed_source_forwards() {
        struct Empty;
        impl WaveformSource for Empty {
            fn fetch(&self, _request: &WaveformRequest) -> Acquisition {
                Acquisition::unavailable("nothing here")
            }
        }

        let source: Box<dyn WaveformSource> = Box::new(Empty);
        let start = Utc.with_ymd_and_hms(2021, 6, 24, 0, 0, 0).unwrap();
        let request = WaveformRequest::new(StreamId::new("9F", "HOPS", "*", "HHE"), start, start);
        assert_eq!(
            source.fetch(&request),
            Acquisition::Unavailable {
                reason: "nothing here".to_string()
            }
        );
        assert_eq!(source.describe(), "waveform source");
    }
}
