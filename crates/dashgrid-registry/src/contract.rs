//! Panel plugin contract.
//!
//! The engine never inspects a panel's concrete type. It talks to panels only
//! through `PanelKind` (one per type tag) and `Panel` (one per grid slot), and
//! panels talk back only through the `PanelCallbacks` bundle.

use crate::catalog::ChannelInfo;
use crate::error::{PanelError, PanelResult};
use dashgrid_core::{
    DataPacket, PanelConfig, PanelSlot, ProjectMetadata, PublishPayload, TimeRange,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Static description of a panel type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelDescriptor {
    /// Tag matched against `PanelConfig::panel_type`.
    pub type_tag: String,
    /// Human-readable name shown in the type-selection dialog.
    pub label: String,
}

impl PanelDescriptor {
    pub fn new(type_tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            label: label.into(),
        }
    }
}

/// Input widget kind for one construction row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InputKind {
    Text { default: String },
    Choice { options: Vec<String> },
    Channel { options: Vec<String> },
}

/// One input row of the "add panel" dialog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructRow {
    pub key: String,
    pub label: String,
    pub input: InputKind,
}

impl ConstructRow {
    pub fn text(key: impl Into<String>, label: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            input: InputKind::Text {
                default: default.into(),
            },
        }
    }

    /// Channel picker over the catalog entries.
    pub fn channel(key: impl Into<String>, label: impl Into<String>, ctx: &ConstructContext) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            input: InputKind::Channel {
                options: ctx.channels.iter().map(|c| c.name.clone()).collect(),
            },
        }
    }
}

/// What the host knows when a construction dialog opens.
#[derive(Debug, Clone, Default)]
pub struct ConstructContext {
    pub channels: Vec<ChannelInfo>,
}

/// Static side of a panel type.
pub trait PanelKind: Send + Sync {
    fn describe(&self) -> PanelDescriptor;

    /// Input rows for creating a new instance of this type.
    fn construct_rows(&self, ctx: &ConstructContext) -> Vec<ConstructRow>;

    /// Turn the filled-in rows into a panel configuration.
    ///
    /// The default copies every input as a string field under its row key.
    fn build_config(&self, inputs: &BTreeMap<String, String>) -> PanelResult<PanelConfig> {
        let mut config = PanelConfig::new(self.describe().type_tag);
        for (key, value) in inputs {
            if key == "type" || key == "deleted" {
                return Err(PanelError::InvalidInput {
                    field: key.clone(),
                    reason: "reserved key".to_string(),
                });
            }
            config.fields.insert(key.clone(), value.clone().into());
        }
        Ok(config)
    }

    /// Create a fresh, unconfigured instance.
    fn create(&self) -> Box<dyn Panel>;
}

/// One live panel instance.
pub trait Panel: Send {
    /// Bind the instance to its configuration. May be called repeatedly.
    fn configure(
        &mut self,
        config: &PanelConfig,
        callbacks: PanelCallbacks,
        project: &ProjectMetadata,
    ) -> PanelResult<()>;

    /// Receive the slot geometry and affordances.
    fn attach(&mut self, _slot: &PanelSlot) {}

    /// Redraw from `packet`. A channel absent from `packet.data` means "no data".
    fn draw(&mut self, packet: &DataPacket, range: &TimeRange) -> PanelResult<()>;

    /// Append every channel this panel needs.
    fn fill_input_channels(&self, channels: &mut Vec<String>);

    /// Whether this panel wants heartbeat ticks.
    fn wants_beat(&self) -> bool {
        false
    }

    /// Heartbeat tick (nominally once per second).
    fn beat(&mut self) {}
}

/// Request a panel can make of the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelRequest {
    /// `None` resets to the layout's default range ending now.
    ChangeDisplayTimeRange(Option<TimeRange>),
    /// Reload the current range from scratch.
    ReloadData,
    /// Fetch only missing channels and redraw.
    UpdateData,
    /// Ignore live push redraws for a while.
    SuspendUpdate(Duration),
    /// Recompose the grid.
    Reconfigure,
    /// Replace this panel's configuration entry.
    UpdateConfig(PanelConfig),
    /// Ask the host to open this panel standalone.
    Popout,
    Publish {
        topic: String,
        message: PublishPayload,
    },
}

/// Request tagged with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelMessage {
    /// Composition the sender belongs to.
    pub epoch: u64,
    /// Slot index of the sender within that composition.
    pub slot: usize,
    pub request: PanelRequest,
}

/// Callback bundle handed to every panel at configure time.
///
/// Requests are queued to the orchestrator and handled in order; none of the
/// methods block.
#[derive(Debug, Clone)]
pub struct PanelCallbacks {
    epoch: u64,
    slot: usize,
    tx: mpsc::UnboundedSender<PanelMessage>,
}

impl PanelCallbacks {
    pub fn new(epoch: u64, slot: usize, tx: mpsc::UnboundedSender<PanelMessage>) -> Self {
        Self { epoch, slot, tx }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    fn send(&self, request: PanelRequest) {
        let message = PanelMessage {
            epoch: self.epoch,
            slot: self.slot,
            request,
        };
        if self.tx.send(message).is_err() {
            debug!(slot = self.slot, "Orchestrator gone, panel request dropped");
        }
    }

    pub fn change_display_time_range(&self, range: Option<TimeRange>) {
        self.send(PanelRequest::ChangeDisplayTimeRange(range));
    }

    pub fn reload_data(&self) {
        self.send(PanelRequest::ReloadData);
    }

    pub fn update_data(&self) {
        self.send(PanelRequest::UpdateData);
    }

    pub fn suspend_update(&self, duration: Duration) {
        self.send(PanelRequest::SuspendUpdate(duration));
    }

    pub fn reconfigure(&self) {
        self.send(PanelRequest::Reconfigure);
    }

    pub fn update_config(&self, config: PanelConfig) {
        self.send(PanelRequest::UpdateConfig(config));
    }

    pub fn popout(&self) {
        self.send(PanelRequest::Popout);
    }

    pub fn publish(&self, topic: impl Into<String>, message: impl Into<PublishPayload>) {
        self.send(PanelRequest::Publish {
            topic: topic.into(),
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Gauge;

    impl PanelKind for Gauge {
        fn describe(&self) -> PanelDescriptor {
            PanelDescriptor::new("gauge", "Gauge")
        }

        fn construct_rows(&self, ctx: &ConstructContext) -> Vec<ConstructRow> {
            vec![ConstructRow::channel("channel", "Channel", ctx)]
        }

        fn create(&self) -> Box<dyn Panel> {
            unimplemented!("not needed by these tests")
        }
    }

    #[test]
    fn test_default_build_config() {
        let mut inputs = BTreeMap::new();
        inputs.insert("channel".to_string(), "sccm.Inj".to_string());

        let config = Gauge.build_config(&inputs).unwrap();
        assert_eq!(config.panel_type.as_deref(), Some("gauge"));
        assert_eq!(config.field("channel"), Some(&json!("sccm.Inj")));
    }

    #[test]
    fn test_build_config_rejects_reserved_keys() {
        let mut inputs = BTreeMap::new();
        inputs.insert("type".to_string(), "other".to_string());
        assert!(Gauge.build_config(&inputs).is_err());
    }

    #[test]
    fn test_channel_row_lists_catalog() {
        let ctx = ConstructContext {
            channels: vec![ChannelInfo::new("A"), ChannelInfo::new("B")],
        };
        let rows = Gauge.construct_rows(&ctx);
        assert_eq!(
            rows[0].input,
            InputKind::Channel {
                options: vec!["A".to_string(), "B".to_string()]
            }
        );
    }

    #[test]
    fn test_callbacks_tag_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callbacks = PanelCallbacks::new(3, 1, tx);

        callbacks.update_data();
        callbacks.publish("control", json!({"run": true}));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.epoch, 3);
        assert_eq!(first.slot, 1);
        assert_eq!(first.request, PanelRequest::UpdateData);

        let second = rx.try_recv().unwrap();
        assert_eq!(
            second.request,
            PanelRequest::Publish {
                topic: "control".to_string(),
                message: PublishPayload::Json(json!({"run": true})),
            }
        );
    }

    #[test]
    fn test_callbacks_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        PanelCallbacks::new(0, 0, tx).reload_data();
    }
}
