//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] dashgrid_core::CoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] dashgrid_registry::RegistryError),

    #[error("Load error: {0}")]
    Load(#[from] dashgrid_loader::LoadError),

    #[error("Stream error: {0}")]
    Stream(#[from] Box<dashgrid_stream::StreamError>),

    #[error("Layout error: {0}")]
    Layout(#[from] dashgrid_layout::LayoutError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dashgrid_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Orchestrator is already running")]
    AlreadyRunning,

    #[error("Orchestrator has stopped")]
    Closed,
}

impl From<dashgrid_stream::StreamError> for AppError {
    fn from(e: dashgrid_stream::StreamError) -> Self {
        Self::Stream(Box::new(e))
    }
}

pub type AppResult<T> = Result<T, AppError>;
