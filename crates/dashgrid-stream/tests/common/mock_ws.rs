//! Mock push server for integration tests.
//!
//! Accepts WebSocket connections, records the request path and every text
//! frame a client sends, and broadcasts pushed records to all clients.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

/// What the server pushes to connected clients.
#[derive(Debug, Clone)]
pub enum Push {
    Text(String),
    Close,
}

/// A mock push server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    push_tx: broadcast::Sender<Push>,
    messages: Arc<Mutex<Vec<String>>>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl MockWsServer {
    /// Start a new mock server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let paths: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let (push_tx, _) = broadcast::channel(16);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let messages_clone = messages.clone();
        let paths_clone = paths.clone();
        let push_clone = push_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            messages_clone.clone(),
                            paths_clone.clone(),
                            push_clone.subscribe(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            push_tx,
            messages,
            paths,
        }
    }

    /// Page location whose push address points at this server.
    pub fn page_location(&self) -> String {
        format!("http://{}/index.html", self.addr)
    }

    /// Push a text frame to every connected client.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.push_tx.send(Push::Text(text.into()));
    }

    /// Close every connected client.
    pub fn close_all(&self) {
        let _ = self.push_tx.send(Push::Close);
    }

    /// Request paths of all accepted connections.
    pub async fn paths(&self) -> Vec<String> {
        self.paths.lock().await.clone()
    }

    /// Text frames received from clients.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<Vec<String>>>,
    paths: Arc<Mutex<Vec<String>>>,
    mut push_rx: broadcast::Receiver<Push>,
) {
    let path = Arc::new(parking_lot::Mutex::new(String::new()));
    let path_slot = path.clone();
    let callback = move |req: &Request, resp: Response| {
        *path_slot.lock() = req.uri().path().to_string();
        Ok::<Response, ErrorResponse>(resp)
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    let accepted = path.lock().clone();
    paths.lock().await.push(accepted);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    messages.lock().await.push(text);
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
            push = push_rx.recv() => match push {
                Ok(Push::Text(text)) => {
                    let _ = write.send(Message::Text(text)).await;
                }
                Ok(Push::Close) | Err(_) => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}
