//! Result line read from the device.
//!
//! ```text
//! {code},{start_s}:{start_ns},{end_s}:{end_ns},{delta_s}:{delta_ns},{distance}\n
//! ```
//!
//! `code` uses the `ResultCode` wire values and `distance` is the echo round
//! trip converted to hundredths of a centimetre. Timestamps are `0:0` unless
//! the code is success.

use hcsr04_common::consts::{RESULT_LINE_CAPACITY, SPEED_OF_SOUND_DIVISOR};
use hcsr04_ranging::{RangingReport, ResultCode};
use std::fmt::Write;
use std::time::Duration;
use thiserror::Error;

/// Distance in hundredths of a centimetre for an echo round trip.
pub fn distance_hundredths(round_trip: Duration) -> u64 {
    let nanos = u64::try_from(round_trip.as_nanos()).unwrap_or(u64::MAX);
    nanos.saturating_mul(100) / SPEED_OF_SOUND_DIVISOR
}

/// Render a report as one result line.
pub fn format_result(report: &RangingReport) -> String {
    let start = report.start_time.unwrap_or_default();
    let end = report.end_time.unwrap_or_default();
    let delta = report.delta_time.unwrap_or_default();

    let mut line = String::with_capacity(RESULT_LINE_CAPACITY);
    // Writing to a String cannot fail.
    let _ = writeln!(
        line,
        "{},{}:{},{}:{},{}:{},{}",
        report.code.as_u8(),
        start.secs(),
        start.subsec_nanos(),
        end.secs(),
        end.subsec_nanos(),
        delta.as_secs(),
        delta.subsec_nanos(),
        distance_hundredths(delta)
    );
    line
}

/// A result line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed result line: {0:?}")]
pub struct ParseResultError(pub String);

/// A parsed result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultLine {
    pub code: ResultCode,
    pub start: Duration,
    pub end: Duration,
    pub delta: Duration,
    /// Distance in hundredths of a centimetre.
    pub distance: u64,
}

impl ResultLine {
    /// Parse one line produced by [`format_result`].
    pub fn parse(line: &str) -> Result<Self, ParseResultError> {
        let err = || ParseResultError(line.to_string());
        let fields: Vec<&str> = line.trim_end().split(',').collect();
        let [code, start, end, delta, distance] = fields.as_slice() else {
            return Err(err());
        };

        let code = code
            .parse::<u8>()
            .ok()
            .and_then(ResultCode::from_u8)
            .ok_or_else(err)?;
        Ok(Self {
            code,
            start: parse_time(start).ok_or_else(err)?,
            end: parse_time(end).ok_or_else(err)?,
            delta: parse_time(delta).ok_or_else(err)?,
            distance: distance.parse().map_err(|_| err())?,
        })
    }

    /// Distance in centimetres.
    pub fn distance_cm(&self) -> f64 {
        self.distance as f64 / 100.0
    }
}

fn parse_time(field: &str) -> Option<Duration> {
    let (secs, nanos) = field.split_once(':')?;
    let nanos: u32 = nanos.parse().ok()?;
    if nanos >= 1_000_000_000 {
        return None;
    }
    Some(Duration::new(secs.parse().ok()?, nanos))
}
