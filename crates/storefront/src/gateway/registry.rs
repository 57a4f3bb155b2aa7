//! Live connection registry.
//!
//! Each connection owns a bounded outbound queue. The transport drains the
//! receiving half and writes frames to the socket; the gateway only ever
//! pushes into the sending half, so a stalled socket never blocks a broadcast.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use super::protocol::ServerEnvelope;

/// Opaque handle for one live client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh, random handle.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of pushing one frame to one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Queued,
    /// Queue full; the frame was dropped.
    Dropped,
    /// Receiver gone, or the connection is not registered.
    Closed,
}

/// Map of live connections to their outbound queues.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<ServerEnvelope>>>,
    buffer: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry whose queues hold `buffer` frames each.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new connection and return its handle and outbound queue.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<ServerEnvelope>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.buffer);
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        tracing::debug!(connection_id = %id, "connection registered");
        (id, rx)
    }

    /// Remove a connection. Returns whether it was registered.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        let removed = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            tracing::debug!(connection_id = %id, "connection unregistered");
        }
        removed
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no connections are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a frame to one connection.
    pub fn send(&self, id: &ConnectionId, message: ServerEnvelope) -> SendStatus {
        let status = {
            let connections = self
                .connections
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match connections.get(id) {
                Some(tx) => push(id, tx, message),
                None => SendStatus::Closed,
            }
        };
        if status == SendStatus::Closed {
            self.unregister(id);
        }
        status
    }

    /// Push a frame to every connection. `origin`, if set, receives
    /// `origin_message` instead (the same frame tagged with its request id).
    ///
    /// Returns how many connections the frame was queued for.
    pub fn broadcast(
        &self,
        message: &ServerEnvelope,
        origin: Option<(&ConnectionId, ServerEnvelope)>,
    ) -> usize {
        let mut closed = Vec::new();
        let mut queued = 0;
        {
            let connections = self
                .connections
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let (origin_id, mut origin_message) = match origin {
                Some((id, msg)) => (Some(*id), Some(msg)),
                None => (None, None),
            };
            for (id, tx) in connections.iter() {
                let frame = if Some(*id) == origin_id {
                    origin_message.take().unwrap_or_else(|| message.clone())
                } else {
                    message.clone()
                };
                match push(id, tx, frame) {
                    SendStatus::Queued => queued += 1,
                    SendStatus::Dropped => {}
                    SendStatus::Closed => closed.push(*id),
                }
            }
        }
        for id in &closed {
            self.unregister(id);
        }
        queued
    }
}

fn push(id: &ConnectionId, tx: &mpsc::Sender<ServerEnvelope>, message: ServerEnvelope) -> SendStatus {
    match tx.try_send(message) {
        Ok(()) => SendStatus::Queued,
        Err(TrySendError::Full(dropped)) => {
            tracing::warn!(
                connection_id = %id,
                event = %dropped.event,
                "outbound queue full, dropping message"
            );
            SendStatus::Dropped
        }
        Err(TrySendError::Closed(_)) => SendStatus::Closed,
    }
}
