//! Gateway error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while handling one inbound frame.
///
/// None of these end the connection; they are reported to the originator as
/// an `error` frame.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The frame is not a JSON envelope.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    /// No route for this event name.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The payload does not match the event's shape.
    #[error("invalid payload for {event}: {source}")]
    InvalidPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The result could not be encoded.
    #[error("failed to encode result: {0}")]
    Encode(#[source] serde_json::Error),
}

impl GatewayError {
    /// Stable machine-readable code for the `error` frame.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedFrame(_) | Self::InvalidPayload { .. } => "invalid_payload",
            Self::UnknownEvent(_) => "unknown_event",
            Self::Store(e) => e.code(),
            Self::Encode(_) => "internal",
        }
    }

    /// Whether the failure is on the server side (worth an error log).
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Store(e) => !e.is_validation(),
            Self::Encode(_) => true,
            _ => false,
        }
    }

    /// Message safe to send to the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}
