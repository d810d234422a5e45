//! Integration tests for dashgrid-app.
//!
//! These tests drive a running orchestrator through its handle:
//! - composition and loading against a scripted series source
//! - panel callbacks and the "add panel" flow
//! - live pushes and publishing against a mock push server

pub mod common;
