//! Request planning.
//!
//! Turns a range and a set of missing channels into the HTTP requests of one
//! load cycle. Pure: no I/O, no clock.

use dashgrid_core::{Channel, TimeRange};

/// Ranges longer than this (seconds) carry a downsampling hint.
pub const RESAMPLE_THRESHOLD_SECS: f64 = 7200.0;

/// Target number of points per series when downsampling.
const RESAMPLE_POINTS: f64 = 600.0;

/// Ranges at least this long (5 days) are fetched one channel per request.
pub const CHUNK_SPLIT_SECS: f64 = 5.0 * 86400.0;

/// Reducer used together with the downsampling hint.
const RESAMPLE_REDUCER: &str = "last";

/// One `GET data/...` request.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub channels: Vec<Channel>,
    /// Range length in seconds.
    pub length: f64,
    /// Range end in epoch seconds.
    pub to: f64,
    /// Downsampling factor, rounded to one decimal.
    pub resample: Option<f64>,
}

impl DataRequest {
    pub fn new(channels: Vec<Channel>, range: &TimeRange) -> Self {
        let length = range.length();
        Self {
            channels,
            length,
            to: range.to,
            resample: resample_factor(length),
        }
    }

    /// The `data/<channels>` path segment: channel names joined by `,`.
    pub fn channel_list(&self) -> String {
        self.channels.join(",")
    }

    /// Query parameters, in wire order.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("length", format_seconds(self.length)),
            ("to", format_seconds(self.to)),
        ];
        if let Some(resample) = self.resample {
            query.push(("resample", format!("{resample:.1}")));
            query.push(("reducer", RESAMPLE_REDUCER.to_string()));
        }
        query
    }
}

/// Downsampling factor for a range length, if one applies.
pub fn resample_factor(length: f64) -> Option<f64> {
    if length > RESAMPLE_THRESHOLD_SECS {
        Some((length / RESAMPLE_POINTS * 10.0).round() / 10.0)
    } else {
        None
    }
}

/// Print whole seconds without a fractional part.
fn format_seconds(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Plan the requests for `missing` over `range`.
///
/// Short ranges go out as one combined request; long ranges as one request
/// per channel, which bounds both payload size and channel count per request.
pub fn plan_requests(range: &TimeRange, missing: &[Channel]) -> Vec<DataRequest> {
    if missing.is_empty() {
        return Vec::new();
    }
    if range.length() < CHUNK_SPLIT_SECS {
        vec![DataRequest::new(missing.to_vec(), range)]
    } else {
        missing
            .iter()
            .map(|ch| DataRequest::new(vec![ch.clone()], range))
            .collect()
    }
}
