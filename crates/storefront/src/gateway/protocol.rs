//! Real-time wire protocol.
//!
//! Every frame is a JSON object with an `event` name and a `payload`.
//!
//! ```text
//! client → server   { "event": "cart:add_product",
//!                     "payload": { "cartId": "c1", "productId": "p2", "quantity": 1 },
//!                     "requestId": "42" }
//! server → client   { "event": "cart:updated", "payload": { ...cart... }, "requestId": "42" }
//! ```
//!
//! `requestId` is optional and is echoed only on messages that go back to the
//! connection that sent the request.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which connections receive the result of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Only the originating connection.
    Reply,
    /// Every live connection, the originator included.
    Broadcast,
}

/// Inbound events the gateway accepts. This is the dispatch table: each event
/// names its wire name, the outbound event carrying its result, and who
/// receives that result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CartCreate,
    CartGet,
    CartList,
    CartAddProduct,
    CartRemoveProduct,
    ProductList,
    ProductGet,
    ProductCreate,
}

impl EventKind {
    pub const ALL: [Self; 8] = [
        Self::CartCreate,
        Self::CartGet,
        Self::CartList,
        Self::CartAddProduct,
        Self::CartRemoveProduct,
        Self::ProductList,
        Self::ProductGet,
        Self::ProductCreate,
    ];

    /// Look up an event by its inbound wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Inbound wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CartCreate => "cart:create",
            Self::CartGet => "cart:get",
            Self::CartList => "cart:list",
            Self::CartAddProduct => "cart:add_product",
            Self::CartRemoveProduct => "cart:remove_product",
            Self::ProductList => "product:list",
            Self::ProductGet => "product:get",
            Self::ProductCreate => "product:create",
        }
    }

    /// Outbound event name carrying the result.
    #[must_use]
    pub const fn result_event(self) -> &'static str {
        match self {
            Self::CartCreate => "cart:created",
            Self::CartGet => "cart",
            Self::CartList => "carts",
            Self::CartAddProduct | Self::CartRemoveProduct => "cart:updated",
            Self::ProductList => "products",
            Self::ProductGet => "product",
            Self::ProductCreate => "product:created",
        }
    }

    /// Who receives the result.
    #[must_use]
    pub const fn delivery(self) -> Delivery {
        match self {
            Self::CartCreate
            | Self::CartAddProduct
            | Self::CartRemoveProduct
            | Self::ProductCreate => Delivery::Broadcast,
            Self::CartGet | Self::CartList | Self::ProductList | Self::ProductGet => {
                Delivery::Reply
            }
        }
    }
}

/// Outbound event name used for failures.
pub const ERROR_EVENT: &str = "error";

// ============================================================================
// Envelopes
// ============================================================================

/// Frame sent by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Frame sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEnvelope {
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ServerEnvelope {
    /// Build an envelope with no request id.
    #[must_use]
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
            request_id: None,
        }
    }

    /// Attach the originator's request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Payload of an `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Inbound event that failed (empty if the frame could not be parsed).
    pub event: String,
    pub code: String,
    pub message: String,
}

// ============================================================================
// Inbound payloads
// ============================================================================

/// An id as sent by a client: a string, or a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(u64),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Payload naming a cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRef {
    pub cart_id: RawId,
}

/// Payload naming a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub product_id: RawId,
}

/// Payload for `cart:add_product`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductPayload {
    pub cart_id: RawId,
    pub product_id: RawId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Payload for `cart:remove_product`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveProductPayload {
    pub cart_id: RawId,
    pub product_id: RawId,
}

const fn default_quantity() -> u32 {
    1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_event_names_are_unique() {
        let names: HashSet<_> = EventKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), EventKind::ALL.len());
    }

    #[test]
    fn test_from_name_round_trips() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("cart:delete"), None);
    }

    #[test]
    fn test_mutations_broadcast_reads_reply() {
        for kind in EventKind::ALL {
            let expected = if matches!(
                kind,
                EventKind::CartCreate
                    | EventKind::CartAddProduct
                    | EventKind::CartRemoveProduct
                    | EventKind::ProductCreate
            ) {
                Delivery::Broadcast
            } else {
                Delivery::Reply
            };
            assert_eq!(kind.delivery(), expected, "{kind:?}");
        }
    }

    #[test]
    fn test_client_envelope_defaults() {
        let env: ClientEnvelope = serde_json::from_str(r#"{"event":"cart:create"}"#).unwrap();
        assert!(env.payload.is_null());
        assert!(env.request_id.is_none());
    }

    #[test]
    fn test_add_product_payload_accepts_numbers_and_default_quantity() {
        let payload: AddProductPayload =
            serde_json::from_str(r#"{"cartId":"c1","productId":3}"#).unwrap();
        assert_eq!(payload.product_id.to_string(), "3");
        assert_eq!(payload.quantity, 1);
    }

    #[test]
    fn test_server_envelope_omits_missing_request_id() {
        let json = serde_json::to_string(&ServerEnvelope::new("carts", serde_json::json!([])))
            .unwrap();
        assert_eq!(json, r#"{"event":"carts","payload":[]}"#);
    }
}
