//! Built-in diagnostic panel.
//!
//! Logs what it is fed instead of rendering it. Handy for headless runs and
//! for checking a layout against a live server.

use dashgrid_core::{DataPacket, PanelConfig, PanelSlot, ProjectMetadata, TimeRange};
use dashgrid_registry::{
    ConstructContext, ConstructRow, Panel, PanelCallbacks, PanelDescriptor, PanelKind, PanelResult,
};
use serde_json::Value;
use tracing::{debug, info};

pub const MONITOR_TYPE: &str = "monitor";

pub struct MonitorKind;

impl PanelKind for MonitorKind {
    fn describe(&self) -> PanelDescriptor {
        PanelDescriptor::new(MONITOR_TYPE, "Channel Monitor")
    }

    fn construct_rows(&self, ctx: &ConstructContext) -> Vec<ConstructRow> {
        vec![
            ConstructRow::channel("channel", "Channel", ctx),
            ConstructRow::text("title", "Title", ""),
        ]
    }

    fn create(&self) -> Box<dyn Panel> {
        Box::new(Monitor::default())
    }
}

#[derive(Default)]
struct Monitor {
    title: String,
    channels: Vec<String>,
    beat: bool,
    slot: Option<usize>,
    draws: u64,
    beats: u64,
}

impl Monitor {
    fn channels_of(config: &PanelConfig) -> Vec<String> {
        match config.field("channels") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => config
                .str_field("channel")
                .map(|ch| vec![ch.to_string()])
                .unwrap_or_default(),
        }
    }
}

impl Panel for Monitor {
    fn configure(
        &mut self,
        config: &PanelConfig,
        callbacks: PanelCallbacks,
        project: &ProjectMetadata,
    ) -> PanelResult<()> {
        self.channels = Self::channels_of(config);
        self.title = config.str_field("title").unwrap_or_default().to_string();
        self.beat = config
            .field("beat")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        self.slot = Some(callbacks.slot());
        debug!(
            slot = callbacks.slot(),
            project = project.name().unwrap_or(""),
            channels = ?self.channels,
            "Monitor configured"
        );
        Ok(())
    }

    fn attach(&mut self, slot: &PanelSlot) {
        debug!(
            slot = slot.index,
            width = slot.rect.width,
            height = slot.rect.height,
            font_scale = slot.font_scale_percent,
            "Monitor attached"
        );
    }

    fn draw(&mut self, packet: &DataPacket, range: &TimeRange) -> PanelResult<()> {
        self.draws += 1;
        for channel in &self.channels {
            match packet.data.get(channel) {
                Some(Value::Array(series)) => info!(
                    title = %self.title,
                    %channel,
                    points = series.len(),
                    transitional = packet.is_transitional,
                    %range,
                    "Series"
                ),
                Some(sample) => info!(
                    title = %self.title,
                    %channel,
                    %sample,
                    transitional = packet.is_transitional,
                    "Sample"
                ),
                None => debug!(%channel, "No data"),
            }
        }
        Ok(())
    }

    fn fill_input_channels(&self, channels: &mut Vec<String>) {
        channels.extend(self.channels.iter().cloned());
    }

    fn wants_beat(&self) -> bool {
        self.beat
    }

    fn beat(&mut self) {
        self.beats += 1;
        if self.beats % 60 == 0 {
            debug!(slot = ?self.slot, draws = self.draws, beats = self.beats, "Monitor alive");
        }
    }
}
