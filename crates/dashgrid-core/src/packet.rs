//! Data packet and time range types.
//!
//! A `DataPacket` is the snapshot every panel draws from. The orchestrator
//! owns the current packet; panels only ever see it by shared reference.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Channel identifier (opaque to the engine).
pub type Channel = String;

/// Loaded series keyed by channel.
///
/// Series payloads are kept as raw JSON; interpreting them is the panel's job.
pub type ChannelData = BTreeMap<Channel, serde_json::Value>;

/// Width of the rolling window attached to live push records (seconds).
pub const LIVE_WINDOW_SECS: f64 = 60.0;

/// Current wall-clock time as fractional epoch seconds.
pub fn epoch_seconds_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Closed time interval in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: f64,
    pub to: f64,
}

impl TimeRange {
    /// Create a range, rejecting inverted or non-finite bounds.
    pub fn new(from: f64, to: f64) -> Result<Self> {
        if !from.is_finite() || !to.is_finite() || from > to {
            return Err(CoreError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// Range of `length` seconds ending at `to`.
    pub fn ending_at(to: f64, length: f64) -> Self {
        Self {
            from: to - length.max(0.0),
            to,
        }
    }

    /// Length in seconds.
    pub fn length(&self) -> f64 {
        self.to - self.from
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Snapshot of loaded channel data for a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPacket {
    /// True while chunks for `range` are still arriving.
    #[serde(rename = "isTransitional")]
    pub is_transitional: bool,
    pub range: TimeRange,
    pub data: ChannelData,
}

impl DataPacket {
    /// Empty, settled packet for `range`.
    pub fn empty(range: TimeRange) -> Self {
        Self {
            is_transitional: false,
            range,
            data: ChannelData::new(),
        }
    }

    /// Empty packet that is waiting for chunks.
    pub fn pending(range: TimeRange) -> Self {
        Self {
            is_transitional: true,
            range,
            data: ChannelData::new(),
        }
    }

    /// Short rolling packet wrapping one live push record.
    ///
    /// Covers `[now - LIVE_WINDOW_SECS, now]` and is always transitional.
    pub fn live(now: f64, record: ChannelData) -> Self {
        Self {
            is_transitional: true,
            range: TimeRange::ending_at(now, LIVE_WINDOW_SECS),
            data: record,
        }
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.data.contains_key(channel)
    }

    /// Channels from `required` not yet present, deduplicated and sorted.
    pub fn missing<'a, I>(&self, required: I) -> Vec<Channel>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut missing: Vec<Channel> = required
            .into_iter()
            .filter(|ch| !ch.is_empty() && !self.has_channel(ch))
            .map(str::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

/// Aggregated status reported when a load completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStatus {
    pub code: u16,
    pub text: String,
}

impl LoadStatus {
    pub fn ok() -> Self {
        Self {
            code: 200,
            text: "OK".to_string(),
        }
    }

    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Status for a request that never produced an HTTP response.
    pub fn transport(text: impl Into<String>) -> Self {
        Self::new(0, text)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// Body of a publish request.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishPayload {
    /// Structured message, sent as JSON.
    Json(serde_json::Value),
    /// Pre-encoded string, sent verbatim.
    Raw(String),
}

impl PublishPayload {
    /// Body text as it goes on the wire.
    pub fn to_body(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Raw(text) => text.clone(),
        }
    }

    /// Value embedded in a socket publish frame.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Raw(text) => serde_json::Value::String(text.clone()),
        }
    }
}

impl From<serde_json::Value> for PublishPayload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for PublishPayload {
    fn from(text: String) -> Self {
        Self::Raw(text)
    }
}
