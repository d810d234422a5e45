//! Layout orchestrator.
//!
//! A single-writer actor. One task owns the configuration, the composed
//! panels and the loader's packet; every other source (host commands, chunk
//! responses, panel callbacks, push records and heartbeat ticks) reaches it as
//! a message and is handled inside one `select!` loop.
//!
//! Update paths:
//! - configuration patch: recompose, then load missing channels
//! - load: redraw on every merged chunk, complete once per call
//! - push record: redraw with a rolling 60 s packet, loader untouched
//! - heartbeat: `beat()` on the panels that opted in

use crate::command::{Command, HostEvent, OrchestratorHandle, Snapshot};
use crate::error::{AppError, AppResult};
use crate::heartbeat::{beat_subscribers, Heartbeat};
use dashgrid_core::{
    epoch_seconds_now, ChannelData, ConfigPatch, Configuration, DataPacket, LoadStatus,
    PublishPayload, TimeRange,
};
use dashgrid_layout::{ComposedPanel, GridComposer, Viewport};
use dashgrid_loader::{
    spawn_requests, ChunkResponse, DataLoader, DynSeriesSource, LoadStart, OnComplete,
};
use dashgrid_registry::{ConstructContext, PanelCallbacks, PanelMessage, PanelRequest};
use dashgrid_stream::{Delivery, Publisher, StreamConfig, StreamingChannel};
use dashgrid_telemetry::Metrics;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const COMMAND_QUEUE: usize = 64;
const RECORD_QUEUE: usize = 256;
const BEAT_QUEUE: usize = 1;
const EVENT_QUEUE: usize = 64;

/// Runtime settings of one orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub viewport: Viewport,
    pub heartbeat_period: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            heartbeat_period: Heartbeat::DEFAULT_PERIOD,
        }
    }
}

/// Receiving ends, moved into the loop by `run`.
struct Inbox {
    commands: mpsc::Receiver<Command>,
    chunks: mpsc::UnboundedReceiver<ChunkResponse>,
    panel_requests: mpsc::UnboundedReceiver<PanelMessage>,
    records: mpsc::Receiver<ChannelData>,
    beats: mpsc::Receiver<()>,
}

struct StreamLink {
    channel: Arc<StreamingChannel>,
    /// Open the push subscription on `run`. When false the channel only
    /// backs the publish fallback.
    connect: bool,
}

pub struct Orchestrator {
    configuration: Configuration,
    composer: GridComposer,
    source: DynSeriesSource,
    settings: OrchestratorSettings,
    loader: DataLoader,
    panels: Vec<ComposedPanel>,
    subscribers: Vec<usize>,
    add_panel: bool,
    epoch: u64,
    suspended_until: Option<Instant>,
    load_started: HashMap<u64, Instant>,
    stream: Option<StreamLink>,
    publisher: Option<Publisher>,
    command_tx: mpsc::Sender<Command>,
    chunk_tx: mpsc::UnboundedSender<ChunkResponse>,
    panel_tx: mpsc::UnboundedSender<PanelMessage>,
    record_tx: mpsc::Sender<ChannelData>,
    beat_tx: mpsc::Sender<()>,
    events: broadcast::Sender<HostEvent>,
    inbox: Option<Inbox>,
    token: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        configuration: Configuration,
        composer: GridComposer,
        source: DynSeriesSource,
        settings: OrchestratorSettings,
    ) -> Self {
        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (chunk_tx, chunks) = mpsc::unbounded_channel();
        let (panel_tx, panel_requests) = mpsc::unbounded_channel();
        let (record_tx, records) = mpsc::channel(RECORD_QUEUE);
        let (beat_tx, beats) = mpsc::channel(BEAT_QUEUE);
        let (events, _) = broadcast::channel(EVENT_QUEUE);

        let configuration = configuration.normalize();
        let loader = DataLoader::new(configuration.initial_range(epoch_seconds_now()));

        Self {
            configuration,
            composer,
            source,
            settings,
            loader,
            panels: Vec::new(),
            subscribers: Vec::new(),
            add_panel: false,
            epoch: 0,
            suspended_until: None,
            load_started: HashMap::new(),
            stream: None,
            publisher: None,
            command_tx,
            chunk_tx,
            panel_tx,
            record_tx,
            beat_tx,
            events,
            inbox: Some(Inbox {
                commands,
                chunks,
                panel_requests,
                records,
                beats,
            }),
            token: CancellationToken::new(),
        }
    }

    /// Subscribe to live pushes and publish through the socket when open.
    pub fn with_stream(self, config: StreamConfig) -> AppResult<Self> {
        self.link_stream(config, true)
    }

    /// Publish through the control endpoint only, without a push subscription.
    pub fn with_publish_fallback(self, config: StreamConfig) -> AppResult<Self> {
        self.link_stream(config, false)
    }

    fn link_stream(mut self, config: StreamConfig, connect: bool) -> AppResult<Self> {
        let channel =
            StreamingChannel::with_token(config, self.record_tx.clone(), self.token.child_token());
        self.publisher = Some(channel.publisher()?);
        self.stream = Some(StreamLink {
            channel: Arc::new(channel),
            connect,
        });
        Ok(self)
    }

    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle::new(self.command_tx.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// Token bound to the orchestrator lifetime.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Compose, load the initial range and run until shutdown.
    pub async fn run(mut self) -> AppResult<()> {
        let mut inbox = self.inbox.take().ok_or(AppError::AlreadyRunning)?;
        let token = self.token.clone();

        info!(
            panels = self.configuration.panels.len(),
            rows = self.configuration.control.grid.rows,
            columns = self.configuration.control.grid.columns,
            "Starting orchestrator"
        );

        if let Some(link) = self.stream.as_ref().filter(|link| link.connect) {
            let channel = link.channel.clone();
            tokio::spawn(async move {
                // Outcome is logged by the channel itself.
                let _ = channel.open().await;
            });
        }

        let heartbeat = Heartbeat::spawn(
            self.settings.heartbeat_period,
            self.beat_tx.clone(),
            &self.token,
        );

        self.recompose();
        let initial = self.configuration.initial_range(epoch_seconds_now());
        self.load(Some(initial), None);

        info!("Entering orchestrator loop");
        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }

                command = inbox.commands.recv() => match command {
                    Some(Command::Shutdown) | None => {
                        info!("Shutdown requested by host");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                },

                Some(response) = inbox.chunks.recv() => self.on_chunk(response),

                Some(message) = inbox.panel_requests.recv() => self.on_panel_message(message),

                Some(record) = inbox.records.recv() => self.on_record(record),

                Some(()) = inbox.beats.recv() => self.on_beat(),
            }
        }

        heartbeat.cancel();
        self.token.cancel();
        self.panels.clear();
        self.subscribers.clear();
        Metrics::stream_disconnected();
        info!(
            epoch = self.epoch,
            generation = self.loader.generation(),
            "Orchestrator stopped"
        );
        Ok(())
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Apply(patch) => self.apply_patch(patch),
            Command::SetConfiguration(configuration) => {
                self.replace_configuration(configuration.normalize());
            }
            Command::Resize(viewport) => {
                debug!(width = viewport.width, height = viewport.height, "Viewport resized");
                self.settings.viewport = viewport;
                self.recompose();
                self.load(None, None);
            }
            Command::Load { range, reply } => self.load(range, reply),
            Command::ForceRedraw => self.reload_current(),
            Command::Snapshot(reply) => {
                if reply.send(self.snapshot()).is_err() {
                    debug!("Snapshot requester gone");
                }
            }
            Command::AddPanelDialog { channels, reply } => {
                let result = self
                    .composer
                    .add_panel_dialog(&self.configuration, ConstructContext { channels })
                    .map_err(AppError::from);
                if reply.send(result).is_err() {
                    debug!("Dialog requester gone");
                }
            }
            Command::Shutdown => self.token.cancel(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            configuration: self.configuration.clone(),
            packet: self.loader.packet().clone(),
            slots: self.panels.iter().map(|p| p.slot.clone()).collect(),
            add_panel: self.add_panel,
            epoch: self.epoch,
            generation: self.loader.generation(),
        }
    }

    // ---------------------------------------------------------------------
    // Configuration and composition
    // ---------------------------------------------------------------------

    fn apply_patch(&mut self, patch: ConfigPatch) {
        debug!(?patch, "Applying configuration patch");
        let next = std::mem::take(&mut self.configuration).apply(patch);
        self.replace_configuration(next);
    }

    fn replace_configuration(&mut self, configuration: Configuration) {
        self.configuration = configuration;
        self.emit(HostEvent::ConfigChanged(self.configuration.clone()));
        self.recompose();
        self.load(None, None);
    }

    /// Rebuild every panel from the current configuration.
    fn recompose(&mut self) {
        self.epoch += 1;
        let composition = self
            .composer
            .compose(&self.configuration, self.settings.viewport);

        let skipped = composition.skipped.len();
        let mut panels = Vec::with_capacity(composition.panels.len());
        for mut composed in composition.panels {
            let callbacks = PanelCallbacks::new(self.epoch, composed.slot.index, self.panel_tx.clone());
            let configured = catch_unwind(AssertUnwindSafe(|| {
                composed
                    .panel
                    .configure(&composed.config, callbacks, &self.configuration.project)
            }));
            match configured {
                Ok(Ok(())) => {
                    composed.panel.attach(&composed.slot);
                    panels.push(composed);
                }
                Ok(Err(e)) => {
                    warn!(slot = composed.slot.index, error = %e, "Panel configure failed, dropping panel");
                }
                Err(_) => {
                    error!(slot = composed.slot.index, "Panel panicked during configure, dropping panel");
                }
            }
        }

        self.panels = panels;
        self.subscribers = beat_subscribers(&self.panels);
        self.add_panel = composition.add_panel;
        Metrics::composed(self.panels.len(), skipped);
        debug!(
            epoch = self.epoch,
            panels = self.panels.len(),
            beat_subscribers = self.subscribers.len(),
            "Panels configured"
        );
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    fn required_channels(&self) -> Vec<String> {
        let mut channels = Vec::new();
        for composed in &self.panels {
            composed.panel.fill_input_channels(&mut channels);
        }
        channels
    }

    /// Start a load. `Some(range)` resets the packet; `None` reuses it.
    fn load(&mut self, range: Option<TimeRange>, reply: Option<oneshot::Sender<LoadStatus>>) {
        Metrics::load_started(range.is_some());

        let events = self.events.clone();
        let on_complete: OnComplete = Box::new(move |status: LoadStatus| {
            if let Some(reply) = reply {
                let _ = reply.send(status.clone());
            }
            let _ = events.send(HostEvent::LoadCompleted(status));
        });

        let required = self.required_channels();
        match self
            .loader
            .begin(range, required.iter().map(String::as_str), on_complete)
        {
            LoadStart::Ready(completion) => {
                self.redraw_loaded();
                Metrics::load_completed(completion.status.code, 0.0);
                completion.finish();
            }
            LoadStart::Pending {
                generation,
                requests,
            } => {
                self.load_started.insert(generation, Instant::now());
                spawn_requests(
                    self.source.clone(),
                    generation,
                    requests,
                    self.chunk_tx.clone(),
                );
            }
        }
    }

    /// Reload the current range from scratch.
    fn reload_current(&mut self) {
        let range = self.loader.range();
        self.load(Some(range), None);
    }

    fn on_chunk(&mut self, response: ChunkResponse) {
        let outcome = if response.generation != self.loader.generation() {
            "stale"
        } else if response.result.is_ok() {
            "ok"
        } else {
            "error"
        };
        Metrics::chunk(outcome);

        let result = self.loader.accept(response);
        if result.merged {
            self.redraw_loaded();
        }
        if let Some(completion) = result.completed {
            let elapsed_ms = self
                .load_started
                .remove(&completion.generation)
                .map(|started| started.elapsed().as_secs_f64() * 1000.0)
                .unwrap_or_default();
            Metrics::load_completed(completion.status.code, elapsed_ms);
            completion.finish();
        }
    }

    fn redraw_loaded(&mut self) {
        let packet = self.loader.packet();
        draw_panels(&mut self.panels, packet, &packet.range);
    }

    // ---------------------------------------------------------------------
    // Panel requests
    // ---------------------------------------------------------------------

    fn on_panel_message(&mut self, message: PanelMessage) {
        if message.epoch != self.epoch {
            debug!(
                epoch = message.epoch,
                current = self.epoch,
                "Request from a previous composition ignored"
            );
            return;
        }

        match message.request {
            PanelRequest::ChangeDisplayTimeRange(range) => {
                let range = range.unwrap_or_else(|| {
                    let length = self.configuration.initial_range(0.0).length();
                    TimeRange::ending_at(epoch_seconds_now(), length)
                });
                info!(slot = message.slot, %range, "Display range changed");
                self.load(Some(range), None);
            }
            PanelRequest::ReloadData => self.reload_current(),
            PanelRequest::UpdateData => self.load(None, None),
            PanelRequest::SuspendUpdate(duration) => {
                debug!(slot = message.slot, ?duration, "Live updates suspended");
                self.suspended_until = Some(Instant::now() + duration);
            }
            PanelRequest::Reconfigure => {
                self.recompose();
                self.load(None, None);
            }
            PanelRequest::UpdateConfig(config) => {
                let Some(index) = self.config_index(message.slot) else {
                    return;
                };
                self.apply_patch(ConfigPatch::ReplacePanel { index, config });
            }
            PanelRequest::Popout => {
                if let Some(composed) = self.panel_at(message.slot) {
                    self.emit(HostEvent::Popout(composed.config.clone()));
                }
            }
            PanelRequest::Publish { topic, message } => self.publish(topic, message),
        }
    }

    /// Panel composed into grid slot `slot`. Dropped panels leave gaps, so
    /// this is not a position in `self.panels`.
    fn panel_at(&self, slot: usize) -> Option<&ComposedPanel> {
        self.panels.iter().find(|p| p.slot.index == slot)
    }

    fn config_index(&self, slot: usize) -> Option<usize> {
        self.panel_at(slot).map(|p| p.slot.config_index)
    }

    fn publish(&self, topic: String, payload: PublishPayload) {
        let Some(publisher) = self.publisher.clone() else {
            warn!(%topic, "No publish route configured, message dropped");
            Metrics::publish("failed");
            return;
        };
        let commands = self.command_tx.clone();

        tokio::spawn(async move {
            match publisher.publish(&topic, &payload).await {
                Ok(Delivery::Direct) => Metrics::publish("direct"),
                Ok(Delivery::Fallback) => {
                    Metrics::publish("fallback");
                    if commands.send(Command::ForceRedraw).await.is_err() {
                        debug!("Orchestrator gone before forced redraw");
                    }
                }
                Err(e) => {
                    Metrics::publish("failed");
                    warn!(%topic, error = %e, "Publish failed");
                }
            }
        });
    }

    // ---------------------------------------------------------------------
    // Live updates
    // ---------------------------------------------------------------------

    fn on_record(&mut self, record: ChannelData) {
        if let Some(until) = self.suspended_until {
            if Instant::now() < until {
                Metrics::push_record(false);
                return;
            }
            self.suspended_until = None;
        }

        Metrics::push_record(true);
        let packet = DataPacket::live(epoch_seconds_now(), record);
        draw_panels(&mut self.panels, &packet, &packet.range);
    }

    fn on_beat(&mut self) {
        Metrics::heartbeat_tick();
        for &index in &self.subscribers {
            if let Some(composed) = self.panels.get_mut(index) {
                if catch_unwind(AssertUnwindSafe(|| composed.panel.beat())).is_err() {
                    error!(slot = index, "Panel panicked during beat");
                }
            }
        }

        if let Some(link) = &self.stream {
            if link.channel.is_connected() {
                Metrics::stream_connected();
            } else {
                Metrics::stream_disconnected();
            }
        }
    }

    fn emit(&self, event: HostEvent) {
        // No receiver is fine: the host may not listen.
        let _ = self.events.send(event);
    }
}

/// Redraw every panel. A failing or panicking panel is logged and skipped.
fn draw_panels(panels: &mut [ComposedPanel], packet: &DataPacket, range: &TimeRange) {
    for composed in panels.iter_mut() {
        let type_tag = composed.config.panel_type.as_deref().unwrap_or("");
        match catch_unwind(AssertUnwindSafe(|| composed.panel.draw(packet, range))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(slot = composed.slot.index, type_tag, error = %e, "Panel redraw failed");
                Metrics::redraw_failed(type_tag, "error");
            }
            Err(_) => {
                error!(slot = composed.slot.index, type_tag, "Panel panicked during redraw");
                Metrics::redraw_failed(type_tag, "panic");
            }
        }
    }
}
