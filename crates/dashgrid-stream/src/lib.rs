//! Live update channel for dashgrid.
//!
//! Provides the push side of the engine:
//! - WebSocket subscription at `subscribe/<topic>`, one record per message
//! - Publish over the open socket, or `POST control/<topic>` when closed
//! - Observable connection state and cancellation-driven close
//!
//! There is no automatic reconnect: errors and closures are logged and the
//! channel stays closed for the rest of its owner's lifetime.

pub mod connection;
pub mod error;
pub mod message;
pub mod publish;

pub use connection::{StreamConfig, StreamState, StreamingChannel, DEFAULT_TOPIC};
pub use error::{StreamError, StreamResult};
pub use message::{parse_record, publish_frame, PublishFrame};
pub use publish::{Delivery, Publisher};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
