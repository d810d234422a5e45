//! Mock data server for integration tests.
//!
//! Serves the push subscription on one port: every accepted client gets the
//! records sent through `push`, and the text frames clients send back are
//! recorded.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

pub struct MockPushServer {
    addr: SocketAddr,
    records: broadcast::Sender<String>,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<usize>>,
    token: CancellationToken,
}

impl MockPushServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (records, _) = broadcast::channel::<String>(16);
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(Mutex::new(0));
        let token = CancellationToken::new();

        let server = Self {
            addr,
            records: records.clone(),
            received: received.clone(),
            connections: connections.clone(),
            token: token.clone(),
        };

        tokio::spawn(async move {
            loop {
                let (stream, _) = tokio::select! {
                    () = token.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok(accepted) => accepted,
                        Err(_) => continue,
                    },
                };
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                let mut records = records.subscribe();
                *connections.lock().await += 1;

                let received = received.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    let (mut write, mut read) = ws.split();
                    loop {
                        tokio::select! {
                            () = token.cancelled() => break,
                            record = records.recv() => match record {
                                Ok(text) => {
                                    let _ = write.send(Message::Text(text)).await;
                                }
                                Err(_) => break,
                            },
                            msg = read.next() => match msg {
                                Some(Ok(Message::Text(text))) => received.lock().await.push(text),
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                _ => {}
                            },
                        }
                    }
                });
            }
        });

        server
    }

    pub fn page_location(&self) -> String {
        format!("http://{}/dash/index.html", self.addr)
    }

    pub fn push(&self, record: serde_json::Value) {
        let _ = self.records.send(record.to_string());
    }

    pub async fn connection_count(&self) -> usize {
        *self.connections.lock().await
    }

    pub async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }
}
