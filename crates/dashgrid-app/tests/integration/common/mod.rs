//! Shared fixtures.

pub mod mock_push;
pub mod recorder;
