//! Recording panel types and orchestrator fixtures.

use dashgrid_app::{HostEvent, Orchestrator, OrchestratorSettings};
use dashgrid_core::{
    ChannelData, Configuration, DataPacket, PanelConfig, PanelSlot, ProjectMetadata, TimeRange,
};
use dashgrid_layout::{GridComposer, Theme};
use dashgrid_loader::{
    BoxFuture, DataRequest, DynSeriesSource, LoadResult, MockSeriesSource, SeriesSource,
};
use dashgrid_registry::{
    ConstructContext, ConstructRow, Panel, PanelCallbacks, PanelDescriptor, PanelKind,
    PanelRegistry, PanelResult,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(5);

/// Everything the recorder panels observed.
#[derive(Default)]
pub struct RecorderLog {
    pub draws: Vec<(String, DataPacket)>,
    pub callbacks: Vec<PanelCallbacks>,
    pub slots: Vec<PanelSlot>,
}

impl RecorderLog {
    /// Draws seen by the panel bound to `channel`.
    pub fn draws_of(&self, channel: &str) -> Vec<DataPacket> {
        self.draws
            .iter()
            .filter(|(ch, _)| ch == channel)
            .map(|(_, packet)| packet.clone())
            .collect()
    }
}

pub type SharedLog = Arc<Mutex<RecorderLog>>;

/// `recorder`: needs the channel in its `channel` field and records every draw.
pub struct RecorderKind(pub SharedLog);

impl PanelKind for RecorderKind {
    fn describe(&self) -> PanelDescriptor {
        PanelDescriptor::new("recorder", "Recorder")
    }

    fn construct_rows(&self, ctx: &ConstructContext) -> Vec<ConstructRow> {
        vec![ConstructRow::channel("channel", "Channel", ctx)]
    }

    fn create(&self) -> Box<dyn Panel> {
        Box::new(Recorder {
            log: self.0.clone(),
            channel: String::new(),
        })
    }
}

struct Recorder {
    log: SharedLog,
    channel: String,
}

impl Panel for Recorder {
    fn configure(
        &mut self,
        config: &PanelConfig,
        callbacks: PanelCallbacks,
        _project: &ProjectMetadata,
    ) -> PanelResult<()> {
        self.channel = config.str_field("channel").unwrap_or_default().to_string();
        self.log.lock().callbacks.push(callbacks);
        Ok(())
    }

    fn attach(&mut self, slot: &PanelSlot) {
        self.log.lock().slots.push(slot.clone());
    }

    fn draw(&mut self, packet: &DataPacket, _range: &TimeRange) -> PanelResult<()> {
        self.log
            .lock()
            .draws
            .push((self.channel.clone(), packet.clone()));
        Ok(())
    }

    fn fill_input_channels(&self, channels: &mut Vec<String>) {
        channels.push(self.channel.clone());
    }
}

/// `panicky`: panics on every draw.
pub struct PanickyKind;

impl PanelKind for PanickyKind {
    fn describe(&self) -> PanelDescriptor {
        PanelDescriptor::new("panicky", "Panicky")
    }

    fn construct_rows(&self, _ctx: &ConstructContext) -> Vec<ConstructRow> {
        Vec::new()
    }

    fn create(&self) -> Box<dyn Panel> {
        Box::new(Panicky)
    }
}

struct Panicky;

impl Panel for Panicky {
    fn configure(
        &mut self,
        _config: &PanelConfig,
        _callbacks: PanelCallbacks,
        _project: &ProjectMetadata,
    ) -> PanelResult<()> {
        Ok(())
    }

    fn draw(&mut self, _packet: &DataPacket, _range: &TimeRange) -> PanelResult<()> {
        panic!("panicky panel");
    }

    fn fill_input_channels(&self, channels: &mut Vec<String>) {
        channels.push("P".to_string());
    }
}

/// Holds every request until `open` is called, then answers from the
/// wrapped scripted source.
pub struct GatedSource {
    inner: Arc<MockSeriesSource>,
    open: AtomicBool,
    gate: Notify,
    arrived: AtomicUsize,
}

impl GatedSource {
    pub fn new(inner: Arc<MockSeriesSource>) -> Self {
        Self {
            inner,
            open: AtomicBool::new(false),
            gate: Notify::new(),
            arrived: AtomicUsize::new(0),
        }
    }

    /// Requests received so far, held or not.
    pub fn arrived(&self) -> usize {
        self.arrived.load(Ordering::SeqCst)
    }

    /// Release held requests and let later ones through.
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.gate.notify_waiters();
    }
}

impl SeriesSource for GatedSource {
    fn fetch(&self, request: DataRequest) -> BoxFuture<'_, LoadResult<ChannelData>> {
        self.arrived.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            loop {
                let opened = self.gate.notified();
                if self.open.load(Ordering::SeqCst) {
                    break;
                }
                opened.await;
            }
            self.inner.fetch(request).await
        })
    }
}

pub struct Fixture {
    pub orchestrator: Orchestrator,
    pub log: SharedLog,
    pub source: Arc<MockSeriesSource>,
}

/// Orchestrator over `recorder` and `panicky` panels and a scripted source
/// serving channels `A` to `D` and `P`.
pub fn fixture(layout: serde_json::Value) -> Fixture {
    let source = scripted_source();
    fixture_with(layout, source.clone(), source)
}

/// Like `fixture`, but every data request waits for the returned gate.
pub fn gated_fixture(layout: serde_json::Value) -> (Fixture, Arc<GatedSource>) {
    let source = scripted_source();
    let gated = Arc::new(GatedSource::new(source.clone()));
    (fixture_with(layout, source, gated.clone()), gated)
}

fn scripted_source() -> Arc<MockSeriesSource> {
    let source = Arc::new(MockSeriesSource::new());
    for channel in ["A", "B", "C", "D", "P"] {
        source.set_series(channel, serde_json::json!([[1.0, 10.0], [2.0, 20.0]]));
    }
    source
}

fn fixture_with(
    layout: serde_json::Value,
    source: Arc<MockSeriesSource>,
    series: DynSeriesSource,
) -> Fixture {
    let log: SharedLog = Arc::new(Mutex::new(RecorderLog::default()));
    let registry = PanelRegistry::load(vec![
        Arc::new(RecorderKind(log.clone())) as Arc<dyn PanelKind>,
        Arc::new(PanickyKind),
    ])
    .with_default_type("recorder");

    let configuration = Configuration::from_json(&layout.to_string()).unwrap();
    let orchestrator = Orchestrator::new(
        configuration,
        GridComposer::new(Arc::new(registry), Theme::default()),
        series,
        OrchestratorSettings {
            heartbeat_period: Duration::from_millis(50),
            ..OrchestratorSettings::default()
        },
    );

    Fixture {
        orchestrator,
        log,
        source,
    }
}

/// Wait for the first event matching `pred`.
pub async fn wait_event<F>(events: &mut broadcast::Receiver<HostEvent>, mut pred: F) -> HostEvent
where
    F: FnMut(&HostEvent) -> bool,
{
    timeout(WAIT, async {
        loop {
            let event = events.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event not received in time")
}

/// Wait for the next `LoadCompleted` status.
pub async fn wait_loaded(events: &mut broadcast::Receiver<HostEvent>) -> dashgrid_core::LoadStatus {
    match wait_event(events, |e| matches!(e, HostEvent::LoadCompleted(_))).await {
        HostEvent::LoadCompleted(status) => status,
        _ => unreachable!(),
    }
}
