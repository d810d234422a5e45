//! Push subscription lifecycle.
//!
//! One `open()` call makes one connection attempt and runs its message loop
//! until the server closes, an error occurs, or shutdown is requested.
//! Inbound records are forwarded to the owner over an mpsc channel.

use crate::error::{StreamError, StreamResult};
use crate::message::parse_record;
use crate::publish::Publisher;
use dashgrid_core::{ApiBase, ChannelData};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Topic subscribed when none is configured.
pub const DEFAULT_TOPIC: &str = "currentdata";

/// Stream configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub base: ApiBase,
    pub topic: String,
    /// Timeout of the publish fallback request.
    pub publish_timeout: Duration,
}

impl StreamConfig {
    pub fn new(base: ApiBase) -> Self {
        Self {
            base,
            topic: DEFAULT_TOPIC.to_string(),
            publish_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// `ws(s)://.../subscribe/<topic>`
    pub fn address(&self) -> String {
        self.base.push_address(&self.topic).into()
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: the connection ended and is not reopened.
    Closed,
}

/// Push channel for live samples.
pub struct StreamingChannel {
    config: StreamConfig,
    state: Arc<RwLock<StreamState>>,
    record_tx: mpsc::Sender<ChannelData>,
    /// Outbound frames (for Publisher).
    outbound_tx: mpsc::Sender<String>,
    /// Outbound receiver (consumed by message loop).
    outbound_rx: Arc<TokioMutex<mpsc::Receiver<String>>>,
    shutdown_token: CancellationToken,
}

impl StreamingChannel {
    pub fn new(config: StreamConfig, record_tx: mpsc::Sender<ChannelData>) -> Self {
        Self::with_token(config, record_tx, CancellationToken::new())
    }

    /// Create a channel whose lifetime is bound to `token`.
    pub fn with_token(
        config: StreamConfig,
        record_tx: mpsc::Sender<ChannelData>,
        token: CancellationToken,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(100);
        Self {
            config,
            state: Arc::new(RwLock::new(StreamState::Disconnected)),
            record_tx,
            outbound_tx,
            outbound_rx: Arc::new(TokioMutex::new(outbound_rx)),
            shutdown_token: token,
        }
    }

    /// Get a publish handle. Handles can be cloned and shared across tasks.
    pub fn publisher(&self) -> StreamResult<Publisher> {
        Publisher::new(
            self.outbound_tx.clone(),
            self.state.clone(),
            self.config.base.clone(),
            self.config.publish_timeout,
        )
    }

    pub fn state(&self) -> StreamState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == StreamState::Connected
    }

    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Request a graceful close.
    pub fn shutdown(&self) {
        info!("StreamingChannel shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect once and run the message loop.
    ///
    /// The outcome is logged here; callers may ignore the returned result.
    pub async fn open(&self) -> StreamResult<()> {
        if self.is_shutdown() {
            *self.state.write() = StreamState::Closed;
            return Ok(());
        }

        *self.state.write() = StreamState::Connecting;
        let result = self.run().await;
        *self.state.write() = StreamState::Closed;

        match &result {
            Ok(()) => info!("Push connection closed"),
            Err(e) => error!(error = %e, "Push connection ended with error"),
        }
        result
    }

    async fn run(&self) -> StreamResult<()> {
        let url = self.config.address();
        info!(%url, "Opening push connection");

        let connect = connect_async_tls_with_config(&url, None, true, None);
        let (ws_stream, _response) = tokio::select! {
            () = self.shutdown_token.cancelled() => {
                info!("Shutdown requested while connecting");
                return Ok(());
            }
            result = connect => result.map_err(|e| StreamError::ConnectionFailed(e.to_string()))?,
        };
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = StreamState::Connected;
        info!("Push connection established");

        loop {
            let outbound_recv = async { self.outbound_rx.lock().await.recv().await };

            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Push connection closed by server");
                            return Err(StreamError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "Push connection read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Push stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }

                outbound = outbound_recv => {
                    if let Some(frame) = outbound {
                        write
                            .send(Message::Text(frame))
                            .await
                            .map_err(|e| StreamError::SendFailed(e.to_string()))?;
                        debug!("Publish frame sent");
                    }
                }
            }
        }
    }

    async fn handle_text_message(&self, text: &str) {
        let record = match parse_record(text) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Dropping malformed push message");
                return;
            }
        };

        debug!(channels = record.len(), "Push record received");
        if self.record_tx.send(record).await.is_err() {
            warn!("Record receiver dropped");
        }
    }
}
