//! Core domain types for the dashgrid layout engine.
//!
//! This crate provides the values every other crate passes around:
//! - `Configuration`: declarative layout (grid, mode, panel list)
//! - `ConfigPatch`: explicit updates applied through a pure function
//! - `DataPacket`, `TimeRange`: the shared snapshot of loaded channel data
//! - `PanelSlot`: computed geometry and affordances of one grid cell
//! - `ApiBase`: endpoint derivation from the page location

pub mod config;
pub mod endpoint;
pub mod error;
pub mod packet;
pub mod slot;

pub use config::{
    ConfigPatch, Configuration, Control, Grid, Mode, PanelConfig, ProjectMetadata, RangeSetting,
};
pub use endpoint::ApiBase;
pub use error::{CoreError, Result};
pub use packet::{
    epoch_seconds_now, Channel, ChannelData, DataPacket, LoadStatus, PublishPayload, TimeRange,
    LIVE_WINDOW_SECS,
};
pub use slot::{Affordances, PanelSlot, Rect};
