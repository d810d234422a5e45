//! Publish handle.
//!
//! Sends over the open push connection when there is one, otherwise falls
//! back to `POST control/<topic>`.

use crate::connection::StreamState;
use crate::error::{StreamError, StreamResult};
use crate::message::publish_frame;
use dashgrid_core::{ApiBase, PublishPayload};
use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const FALLBACK_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// How a publish was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the open socket.
    Direct,
    /// Written through the HTTP control endpoint. The host should redraw.
    Fallback,
}

/// Clonable publish handle.
#[derive(Clone)]
pub struct Publisher {
    tx: mpsc::Sender<String>,
    state: Arc<RwLock<StreamState>>,
    client: Client,
    base: ApiBase,
}

impl Publisher {
    pub fn new(
        tx: mpsc::Sender<String>,
        state: Arc<RwLock<StreamState>>,
        base: ApiBase,
        timeout: Duration,
    ) -> StreamResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StreamError::Http(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            tx,
            state,
            client,
            base,
        })
    }

    pub fn is_connected(&self) -> bool {
        *self.state.read() == StreamState::Connected
    }

    /// Publish `payload` on `topic`.
    pub async fn publish(&self, topic: &str, payload: &PublishPayload) -> StreamResult<Delivery> {
        if self.is_connected() {
            let frame = publish_frame(topic, payload)?;
            match self.tx.send(frame).await {
                Ok(()) => {
                    debug!(topic, "Publish queued on push connection");
                    return Ok(Delivery::Direct);
                }
                Err(_) => warn!(topic, "Push connection gone, using fallback"),
            }
        }

        self.post_control(topic, payload).await?;
        Ok(Delivery::Fallback)
    }

    async fn post_control(&self, topic: &str, payload: &PublishPayload) -> StreamResult<()> {
        let url = self.base.control_address(topic);
        info!(%url, "Publishing through control endpoint");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, FALLBACK_CONTENT_TYPE)
            .body(payload.to_body())
            .send()
            .await
            .map_err(|e| StreamError::Http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Http(format!("HTTP {status}: {body}")));
        }
        Ok(())
    }
}
