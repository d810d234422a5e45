//! Prometheus metrics and structured logging for dashgrid.
//!
//! Provides:
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus metrics for load cycles, push traffic and redraw failures
//! - A text exposition helper for hosts that serve `/metrics`

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{render, Metrics};
