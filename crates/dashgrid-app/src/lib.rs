//! dashgrid layout orchestrator.
//!
//! Wires the engine together:
//! - `Orchestrator`: single-writer actor owning configuration, panels and
//!   the current data packet
//! - `Heartbeat`: cancellable 1-second tick fanned out to subscribed panels
//! - `OrchestratorHandle`: host commands, `HostEvent` notifications
//! - `AppConfig`: TOML settings for the headless runner
//! - `MonitorKind`: built-in diagnostic panel that logs what it receives

pub mod command;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod monitor;
pub mod orchestrator;

pub use command::{Command, HostEvent, OrchestratorHandle, Snapshot};
pub use config::{AppConfig, StreamSettings};
pub use error::{AppError, AppResult};
pub use heartbeat::{beat_subscribers, Heartbeat};
pub use monitor::{MonitorKind, MONITOR_TYPE};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
