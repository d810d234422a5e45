//! Host-facing command surface of the orchestrator.

use crate::error::{AppError, AppResult};
use dashgrid_core::{
    ConfigPatch, Configuration, DataPacket, LoadStatus, PanelConfig, PanelSlot, TimeRange,
};
use dashgrid_layout::{AddPanelDialog, Viewport};
use dashgrid_registry::ChannelInfo;
use tokio::sync::{mpsc, oneshot};

/// Request from the host to the orchestrator.
pub enum Command {
    /// Apply a configuration change and recompose.
    Apply(ConfigPatch),
    /// Replace the whole configuration and recompose.
    SetConfiguration(Configuration),
    /// Viewport changed.
    Resize(Viewport),
    /// Start a load. `None` keeps the current range.
    Load {
        range: Option<TimeRange>,
        reply: Option<oneshot::Sender<LoadStatus>>,
    },
    ForceRedraw,
    Snapshot(oneshot::Sender<Snapshot>),
    AddPanelDialog {
        channels: Vec<ChannelInfo>,
        reply: oneshot::Sender<AppResult<AddPanelDialog>>,
    },
    Shutdown,
}

/// Point-in-time view of the orchestrator state.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub configuration: Configuration,
    pub packet: DataPacket,
    pub slots: Vec<PanelSlot>,
    pub add_panel: bool,
    /// Composition counter.
    pub epoch: u64,
    /// Load generation counter.
    pub generation: u64,
}

/// Notification to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The configuration changed; the host should persist it.
    ConfigChanged(Configuration),
    /// A panel asked to be opened standalone.
    Popout(PanelConfig),
    LoadCompleted(LoadStatus),
}

/// Clonable handle for sending commands.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<Command>,
}

impl OrchestratorHandle {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    async fn send(&self, command: Command) -> AppResult<()> {
        self.tx.send(command).await.map_err(|_| AppError::Closed)
    }

    pub async fn apply(&self, patch: ConfigPatch) -> AppResult<()> {
        self.send(Command::Apply(patch)).await
    }

    pub async fn set_configuration(&self, configuration: Configuration) -> AppResult<()> {
        self.send(Command::SetConfiguration(configuration)).await
    }

    pub async fn resize(&self, viewport: Viewport) -> AppResult<()> {
        self.send(Command::Resize(viewport)).await
    }

    /// Start a load and wait for its final status.
    pub async fn load(&self, range: Option<TimeRange>) -> AppResult<LoadStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Load {
            range,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| AppError::Closed)
    }

    pub async fn force_redraw(&self) -> AppResult<()> {
        self.send(Command::ForceRedraw).await
    }

    pub async fn snapshot(&self) -> AppResult<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        rx.await.map_err(|_| AppError::Closed)
    }

    /// Open the "add panel" dialog over the given channel catalog.
    pub async fn add_panel_dialog(&self, channels: Vec<ChannelInfo>) -> AppResult<AddPanelDialog> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::AddPanelDialog { channels, reply }).await?;
        rx.await.map_err(|_| AppError::Closed)?
    }

    pub async fn shutdown(&self) -> AppResult<()> {
        self.send(Command::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
