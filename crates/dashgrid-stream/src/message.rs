//! Wire format of the push channel.
//!
//! Inbound: one JSON object per text message, `channel → sample`.
//! Outbound: `{"topic": ..., "message": ...}`.

use crate::error::{StreamError, StreamResult};
use dashgrid_core::{ChannelData, PublishPayload};
use serde::{Deserialize, Serialize};

/// Publish frame sent over an open socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishFrame {
    pub topic: String,
    pub message: serde_json::Value,
}

/// Parse one inbound record.
pub fn parse_record(text: &str) -> StreamResult<ChannelData> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    match value {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(StreamError::ParseError(format!(
            "record must be an object, got {other}"
        ))),
    }
}

/// Encode a publish frame.
pub fn publish_frame(topic: &str, payload: &PublishPayload) -> StreamResult<String> {
    let frame = PublishFrame {
        topic: topic.to_string(),
        message: payload.to_value(),
    };
    Ok(serde_json::to_string(&frame)?)
}
