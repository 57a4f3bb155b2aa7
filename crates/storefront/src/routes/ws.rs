//! WebSocket transport for the real-time gateway.
//!
//! One task per socket reads frames and hands them to the gateway in order;
//! a second task drains the connection's outbound queue into the socket and
//! sends keepalive pings.

use std::time::Duration;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::time::{MissedTickBehavior, interval};

use crate::error::add_breadcrumb;
use crate::gateway::Connection;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket upgrade handler.
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one WebSocket connection until it closes.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let gateway = state.gateway();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let Connection { id, mut outbound } = gateway.connect();
    let connection_id = id.to_string();
    add_breadcrumb("ws", "Client connected", Some(&[("connection_id", connection_id.as_str())]));

    // Forward queued frames to the socket
    let send_task = tokio::spawn(async move {
        let mut ping = interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let message = tokio::select! {
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    match serde_json::to_string(&frame) {
                        Ok(text) => Message::Text(text.into()),
                        Err(e) => {
                            tracing::error!(error = %e, event = %frame.event, "failed to encode frame");
                            continue;
                        }
                    }
                }
                _ = ping.tick() => Message::Ping(Vec::new().into()),
            };
            if ws_tx.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => gateway.handle_frame(&id, text.as_str()).await,
            // Binary frames carry the same JSON; invalid UTF-8 is reported as malformed
            Ok(Message::Binary(data)) => {
                gateway
                    .handle_frame(&id, std::str::from_utf8(&data).unwrap_or_default())
                    .await;
            }
            Ok(Message::Close(_)) => break,
            // axum replies to pings itself; pongs only confirm liveness

            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "websocket error");
                break;
            }
        }
    }

    gateway.disconnect(&id);
    send_task.abort();
    add_breadcrumb("ws", "Client disconnected", Some(&[("connection_id", connection_id.as_str())]));
}
