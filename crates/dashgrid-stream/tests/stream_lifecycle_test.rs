//! Push channel lifecycle against a mock server.

mod common;

use common::mock_ws::MockWsServer;
use dashgrid_core::{ApiBase, ChannelData, PublishPayload};
use dashgrid_stream::{Delivery, StreamConfig, StreamError, StreamState, StreamingChannel};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn open(
    server: &MockWsServer,
) -> (
    Arc<StreamingChannel>,
    mpsc::Receiver<ChannelData>,
    JoinHandle<Result<(), StreamError>>,
) {
    let base = ApiBase::from_page_location(&server.page_location()).unwrap();
    let (tx, rx) = mpsc::channel(16);
    let channel = Arc::new(StreamingChannel::new(StreamConfig::new(base), tx));
    let runner = channel.clone();
    let handle = tokio::spawn(async move { runner.open().await });
    (channel, rx, handle)
}

async fn wait_for_state(channel: &StreamingChannel, state: StreamState) {
    timeout(WAIT, async {
        while channel.state() != state {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("state never became {state:?}"));
}

#[tokio::test]
async fn test_subscribes_at_topic_path() {
    let server = MockWsServer::start().await;
    let (channel, _rx, handle) = open(&server);
    wait_for_state(&channel, StreamState::Connected).await;

    assert_eq!(server.paths().await, vec!["/subscribe/currentdata".to_string()]);

    channel.shutdown();
    timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn test_records_forwarded_and_malformed_dropped() {
    let server = MockWsServer::start().await;
    let (channel, mut rx, handle) = open(&server);
    wait_for_state(&channel, StreamState::Connected).await;

    server.push("not json");
    server.push("[1, 2]");
    server.push(r#"{"psia.Vacuum": 3.5e-7}"#);

    let record = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(record.len(), 1);
    assert_eq!(record["psia.Vacuum"], json!(3.5e-7));

    channel.shutdown();
    timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
    assert_eq!(channel.state(), StreamState::Closed);
    server.shutdown().await;
}

#[tokio::test]
async fn test_publish_goes_over_open_socket() {
    let server = MockWsServer::start().await;
    let (channel, _rx, handle) = open(&server);
    wait_for_state(&channel, StreamState::Connected).await;

    let publisher = channel.publisher().unwrap();
    let delivery = publisher
        .publish("control", &PublishPayload::Json(json!({"valve": "open"})))
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Direct);

    let received = timeout(WAIT, async {
        loop {
            let messages = server.received_messages().await;
            if !messages.is_empty() {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    let frame: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
    assert_eq!(frame, json!({"topic": "control", "message": {"valve": "open"}}));

    channel.shutdown();
    timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn test_server_close_is_not_reconnected() {
    let server = MockWsServer::start().await;
    let (channel, _rx, handle) = open(&server);
    wait_for_state(&channel, StreamState::Connected).await;

    server.close_all();
    let result = timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(matches!(result, Err(StreamError::ConnectionClosed { .. })));
    assert_eq!(channel.state(), StreamState::Closed);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.paths().await.len(), 1);
    server.shutdown().await;
}
