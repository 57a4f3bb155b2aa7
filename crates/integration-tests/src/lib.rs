//! Integration tests for Cartwire.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartwire-integration-tests
//! ```
//!
//! Each test starts its own storefront on an ephemeral port with data files in
//! a scratch directory, then talks to it over HTTP and WebSocket like a real
//! client would.
//!
//! # Test Categories
//!
//! - `realtime` - Broadcast and failure isolation across live connections
//! - `persistence` - Durable files across restarts

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cartwire_storefront::config::StorefrontConfig;
use cartwire_storefront::gateway::ServerEnvelope;
use cartwire_storefront::routes;
use cartwire_storefront::state::AppState;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// How long a test waits for a frame before giving up.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// A storefront running in the background of a test.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server whose data files live in `data_dir`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(data_dir: &Path) -> Self {
        let config = StorefrontConfig {
            port: 0,
            carts_path: data_dir.join("carts.json"),
            products_path: data_dir.join("products.json"),
            ..StorefrontConfig::default()
        };
        let state = AppState::new(config.clone());
        state.initialize().await;

        let listener = tokio::net::TcpListener::bind(config.socket_addr())
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = routes::router(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL for HTTP requests.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Open a WebSocket client against `/ws`.
    ///
    /// # Panics
    ///
    /// Panics if the handshake fails.
    pub async fn connect(&self) -> Client {
        let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("websocket handshake");
        Client { socket }
    }

    /// Wait until the gateway has registered `n` connections.
    ///
    /// # Panics
    ///
    /// Panics if that does not happen within [`FRAME_TIMEOUT`].
    pub async fn wait_for_connections(&self, n: usize) {
        tokio::time::timeout(FRAME_TIMEOUT, async {
            while self.state.gateway().connection_count() != n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("connections registered");
    }

    /// Stop the server.
    pub fn stop(self) {
        self.handle.abort();
    }
}

/// A WebSocket client speaking the gateway's JSON envelopes.
pub struct Client {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    /// Send an event with an optional request id.
    ///
    /// # Panics
    ///
    /// Panics if the socket is closed.
    pub async fn send(&mut self, event: &str, payload: Value, request_id: Option<&str>) {
        let mut frame = json!({ "event": event, "payload": payload });
        if let Some(request_id) = request_id {
            frame["requestId"] = json!(request_id);
        }
        self.send_raw(&frame.to_string()).await;
    }

    /// Send a raw text frame.
    ///
    /// # Panics
    ///
    /// Panics if the socket is closed.
    pub async fn send_raw(&mut self, text: &str) {
        self.socket
            .send(Message::text(text))
            .await
            .expect("send frame");
    }

    /// Next envelope from the server, skipping control frames.
    ///
    /// # Panics
    ///
    /// Panics on timeout, close, or a frame that is not an envelope.
    pub async fn recv(&mut self) -> ServerEnvelope {
        loop {
            let msg = tokio::time::timeout(FRAME_TIMEOUT, self.socket.next())
                .await
                .expect("frame before timeout")
                .expect("socket open")
                .expect("valid frame");
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).expect("server envelope");
            }
        }
    }

    /// Assert that no envelope arrives within `wait`.
    ///
    /// # Panics
    ///
    /// Panics if one does.
    pub async fn expect_silence(&mut self, wait: Duration) {
        let result = tokio::time::timeout(wait, async {
            loop {
                match self.socket.next().await {
                    Some(Ok(Message::Text(text))) => return text.to_string(),
                    Some(Ok(_)) => {}
                    _ => return std::future::pending::<String>().await,
                }
            }
        })
        .await;
        if let Ok(text) = result {
            panic!("unexpected frame: {text}");
        }
    }
}

/// Scratch directory for one test's data files.
///
/// # Panics
///
/// Panics if the directory cannot be created.
#[must_use]
pub fn data_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

/// Path of the cart file inside a data directory.
#[must_use]
pub fn carts_file(dir: &Path) -> PathBuf {
    dir.join("carts.json")
}

/// A valid product body.
#[must_use]
pub fn product_body(code: &str) -> Value {
    json!({
        "title": format!("Product {code}"),
        "code": code,
        "price": "12.50",
        "stock": 10,
        "category": "fruit"
    })
}
