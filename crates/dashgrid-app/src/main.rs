//! dashgrid headless runner - Entry Point
//!
//! Loads a JSON layout, composes it with the built-in panel types and keeps it
//! fed from the data server until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use dashgrid_app::{
    AppConfig, HostEvent, MonitorKind, Orchestrator, OrchestratorSettings, MONITOR_TYPE,
};
use dashgrid_core::Configuration;
use dashgrid_layout::GridComposer;
use dashgrid_loader::HttpSeriesSource;
use dashgrid_registry::{CatalogClient, PanelKind, PanelRegistry};
use dashgrid_stream::StreamConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// dashgrid layout engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DASHGRID_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Layout file, overrides `layout_path` from the configuration
    #[arg(short, long)]
    layout: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection
    dashgrid_stream::init_crypto();

    let args = Args::parse();

    dashgrid_telemetry::init_logging()?;

    info!("Starting dashgrid v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > DASHGRID_CONFIG env var > default
    let config = match args.config {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            AppConfig::from_file(&path)?
        }
        None => AppConfig::load()?,
    };
    let layout_path = args.layout.unwrap_or_else(|| config.layout_path.clone());
    info!(page_location = %config.page_location, %layout_path, "Configuration loaded");

    let layout = std::fs::read_to_string(&layout_path)
        .with_context(|| format!("Failed to read layout {layout_path}"))?;
    let configuration = Configuration::from_json(&layout)?;

    let base = config.api_base()?;
    let registry = PanelRegistry::load(vec![Arc::new(MonitorKind) as Arc<dyn PanelKind>])
        .with_default_type(MONITOR_TYPE);
    debug!(types = ?registry.descriptors(), "Panel registry loaded");

    match CatalogClient::with_timeout(&base, config.request_timeout())?
        .fetch_channels()
        .await
    {
        Ok(channels) => info!(count = channels.len(), "Channel catalog available"),
        Err(e) => warn!(error = %e, "Channel catalog unavailable"),
    }

    let composer = GridComposer::new(Arc::new(registry), config.theme.clone());
    let source = Arc::new(HttpSeriesSource::with_timeout(
        base.clone(),
        config.request_timeout(),
    )?);
    let settings = OrchestratorSettings {
        viewport: config.viewport,
        heartbeat_period: config.heartbeat_period(),
    };

    let stream_config = StreamConfig::new(base).with_topic(config.stream.topic.clone());
    let orchestrator = Orchestrator::new(configuration, composer, source, settings);
    let orchestrator = if config.stream.enabled {
        orchestrator.with_stream(stream_config)?
    } else {
        orchestrator.with_publish_fallback(stream_config)?
    };

    let handle = orchestrator.handle();
    let mut events = orchestrator.subscribe();
    let run = tokio::spawn(orchestrator.run());

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                HostEvent::LoadCompleted(status) => info!(%status, "Load completed"),
                HostEvent::ConfigChanged(_) => info!("Layout changed"),
                HostEvent::Popout(config) => info!(panel_type = ?config.panel_type, "Popout requested"),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    if let Err(e) = handle.shutdown().await {
        warn!(error = %e, "Orchestrator already stopped");
    }
    run.await??;

    debug!(metrics = %dashgrid_telemetry::render()?, "Final metrics");
    Ok(())
}
