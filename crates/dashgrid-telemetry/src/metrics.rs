//! Prometheus metrics for the dashgrid engine.
//!
//! Covers:
//! - Load cycles (started, completed by status, duration)
//! - Chunk requests by outcome
//! - Push records and publishes
//! - Compositions, active and skipped panels
//! - Redraw failures per panel type
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a fatal configuration error that should
//! crash at startup. These panics only occur during static initialization.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_int_counter,
    register_int_gauge, CounterVec, Encoder, Gauge, Histogram, IntCounter, IntGauge, TextEncoder,
};

/// Load cycles started. Labels: kind (range/reuse)
pub static LOADS_STARTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashgrid_loads_started_total",
        "Total load cycles started",
        &["kind"]
    )
    .unwrap()
});

/// Load cycles completed. Labels: code (HTTP status, 0 for transport failure)
pub static LOADS_COMPLETED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashgrid_loads_completed_total",
        "Total load cycles completed by final status",
        &["code"]
    )
    .unwrap()
});

/// Load cycle duration in milliseconds.
pub static LOAD_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "dashgrid_load_duration_ms",
        "Load cycle duration from start to completion in milliseconds",
        vec![5.0, 20.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Chunk responses. Labels: outcome (ok/error/stale)
pub static CHUNKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashgrid_chunks_total",
        "Total chunk responses by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Push records. Labels: handling (drawn/suspended)
pub static PUSH_RECORDS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashgrid_push_records_total",
        "Total live push records received",
        &["handling"]
    )
    .unwrap()
});

/// Publishes. Labels: delivery (direct/fallback/failed)
pub static PUBLISH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashgrid_publish_total",
        "Total publish requests by delivery path",
        &["delivery"]
    )
    .unwrap()
});

/// Push connection state (1 = connected).
pub static STREAM_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "dashgrid_stream_connected",
        "Push connection state (1=connected)"
    )
    .unwrap()
});

/// Redraw failures. Labels: type_tag, kind (error/panic)
pub static REDRAW_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashgrid_redraw_failures_total",
        "Total panel redraw failures",
        &["type_tag", "kind"]
    )
    .unwrap()
});

pub static COMPOSITIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("dashgrid_compositions_total", "Total grid compositions").unwrap()
});

pub static PANELS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dashgrid_panels_active", "Panels in the current composition").unwrap()
});

pub static PANELS_SKIPPED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dashgrid_panels_skipped",
        "Panel entries skipped in the current composition"
    )
    .unwrap()
});

pub static HEARTBEAT_TICKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("dashgrid_heartbeat_ticks_total", "Total heartbeat ticks").unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a load start. `reset` is true when a new range was given.
    pub fn load_started(reset: bool) {
        let kind = if reset { "range" } else { "reuse" };
        LOADS_STARTED_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn load_completed(code: u16, duration_ms: f64) {
        LOADS_COMPLETED_TOTAL
            .with_label_values(&[&code.to_string()])
            .inc();
        LOAD_DURATION_MS.observe(duration_ms);
    }

    /// Record a chunk response (`ok`, `error` or `stale`).
    pub fn chunk(outcome: &str) {
        CHUNKS_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn push_record(drawn: bool) {
        let handling = if drawn { "drawn" } else { "suspended" };
        PUSH_RECORDS_TOTAL.with_label_values(&[handling]).inc();
    }

    pub fn publish(delivery: &str) {
        PUBLISH_TOTAL.with_label_values(&[delivery]).inc();
    }

    pub fn stream_connected() {
        STREAM_CONNECTED.set(1.0);
    }

    pub fn stream_disconnected() {
        STREAM_CONNECTED.set(0.0);
    }

    /// Record a failed redraw (`error` or `panic`).
    pub fn redraw_failed(type_tag: &str, kind: &str) {
        REDRAW_FAILURES_TOTAL
            .with_label_values(&[type_tag, kind])
            .inc();
    }

    pub fn composed(active: usize, skipped: usize) {
        COMPOSITIONS_TOTAL.inc();
        PANELS_ACTIVE.set(i64::try_from(active).unwrap_or(i64::MAX));
        PANELS_SKIPPED.set(i64::try_from(skipped).unwrap_or(i64::MAX));
    }

    pub fn heartbeat_tick() {
        HEARTBEAT_TICKS_TOTAL.inc();
    }
}

/// Encode every registered metric in the Prometheus text format.
pub fn render() -> TelemetryResult<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}
