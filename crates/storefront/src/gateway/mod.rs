//! Real-time gateway.
//!
//! Bridges inbound client events to the cart and product stores and fans the
//! results out to live connections.
//!
//! # Flow
//!
//! 1. The transport calls [`Gateway::connect`] and gets a [`Connection`]: a
//!    handle plus the queue of frames to write to the socket.
//! 2. Each inbound text frame goes to [`Gateway::handle_frame`]. The transport
//!    awaits it before reading the next frame, so one connection's events run
//!    in order.
//! 3. The event is looked up in the [`EventKind`] dispatch table, run against
//!    the stores, and the result is either replied to the originator or
//!    broadcast to every connection.
//! 4. Failures become an `error` frame for the originator only.
//! 5. [`Gateway::disconnect`] drops the connection's queue; no store state
//!    changes.
//!
//! Broadcasting mutations run under one gateway-wide lock covering both the
//! store write and the fan-out, so every connection sees state-change frames
//! in the same order the changes were committed.

mod error;
pub mod protocol;
mod registry;

use std::sync::Arc;

use cartwire_core::{Cart, CartId, NewProduct, Product, ProductId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, mpsc};
use tracing::instrument;

pub use error::GatewayError;
pub use protocol::{Delivery, ErrorPayload, EventKind, ServerEnvelope};
pub use registry::{ConnectionId, ConnectionRegistry, SendStatus};

use crate::store::{CartStore, ProductStore, StoreError};
use protocol::{
    AddProductPayload, CartRef, ClientEnvelope, ERROR_EVENT, ProductRef, RemoveProductPayload,
};

/// A live connection as seen by the transport.
pub struct Connection {
    pub id: ConnectionId,
    /// Frames to write to the client, in order.
    pub outbound: mpsc::Receiver<ServerEnvelope>,
}

/// Real-time gateway over the cart and product stores.
///
/// Cheap to clone via `Arc`.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    carts: CartStore,
    products: ProductStore,
    connections: ConnectionRegistry,
    publish: Mutex<()>,
}

impl Gateway {
    /// Create a gateway. `outbound_buffer` bounds each connection's queue.
    #[must_use]
    pub fn new(carts: CartStore, products: ProductStore, outbound_buffer: usize) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                carts,
                products,
                connections: ConnectionRegistry::new(outbound_buffer),
                publish: Mutex::new(()),
            }),
        }
    }

    /// The cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    /// The product store.
    #[must_use]
    pub fn products(&self) -> &ProductStore {
        &self.inner.products
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    /// Register a new connection.
    pub fn connect(&self) -> Connection {
        let (id, outbound) = self.inner.connections.register();
        tracing::info!(connection_id = %id, "client connected");
        Connection { id, outbound }
    }

    /// Release a connection. Store state is not touched.
    pub fn disconnect(&self, id: &ConnectionId) {
        if self.inner.connections.unregister(id) {
            tracing::info!(connection_id = %id, "client disconnected");
        }
    }

    /// Handle one inbound text frame from `origin`.
    ///
    /// Never fails: errors are logged and sent back to `origin` as an `error`
    /// frame.
    #[instrument(skip_all, fields(connection_id = %origin))]
    pub async fn handle_frame(&self, origin: &ConnectionId, text: &str) {
        match serde_json::from_str::<ClientEnvelope>(text) {
            Ok(envelope) => self.handle_event(origin, envelope).await,
            Err(e) => self.report(origin, "", None, &GatewayError::MalformedFrame(e)),
        }
    }

    /// Handle one parsed inbound event from `origin`.
    pub async fn handle_event(&self, origin: &ConnectionId, envelope: ClientEnvelope) {
        let ClientEnvelope {
            event,
            payload,
            request_id,
        } = envelope;

        let Some(kind) = EventKind::from_name(&event) else {
            let err = GatewayError::UnknownEvent(event.clone());
            self.report(origin, &event, request_id, &err);
            return;
        };

        let result = match kind.delivery() {
            Delivery::Reply => self.execute(kind, payload).await.map(|result| {
                let reply = ServerEnvelope::new(kind.result_event(), result)
                    .with_request_id(request_id.clone());
                self.inner.connections.send(origin, reply);
            }),
            Delivery::Broadcast => {
                let _guard = self.inner.publish.lock().await;
                self.execute(kind, payload).await.map(|result| {
                    let message = ServerEnvelope::new(kind.result_event(), result);
                    let tagged = message.clone().with_request_id(request_id.clone());
                    self.inner
                        .connections
                        .broadcast(&message, Some((origin, tagged)));
                })
            }
        };

        if let Err(err) = result {
            self.report(origin, &event, request_id, &err);
        }
    }

    /// Broadcast the result of a mutation performed outside the real-time
    /// channel (e.g. over HTTP), using the event's configured delivery.
    ///
    /// The mutation itself is run by `op` under the same publish lock as
    /// real-time mutations, so the frame order matches commit order.
    ///
    /// # Errors
    ///
    /// Returns the store error from `op`, or an encoding error.
    pub async fn publish<T, F, Fut>(&self, kind: EventKind, op: F) -> Result<T, GatewayError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let _guard = self.inner.publish.lock().await;
        let value = op().await?;
        if kind.delivery() == Delivery::Broadcast {
            let payload = serde_json::to_value(&value).map_err(GatewayError::Encode)?;
            let message = ServerEnvelope::new(kind.result_event(), payload);
            self.inner.connections.broadcast(&message, None);
        }
        Ok(value)
    }

    /// Run an event against the stores and encode the result.
    async fn execute(
        &self,
        kind: EventKind,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let carts = &self.inner.carts;
        let products = &self.inner.products;

        match kind {
            EventKind::CartCreate => encode(&carts.create_cart().await?),
            EventKind::CartGet => {
                let CartRef { cart_id } = decode(kind, payload)?;
                let cart_id = CartId::coerce(cart_id);
                let cart = carts
                    .get_cart(&cart_id)
                    .await
                    .ok_or(StoreError::CartNotFound(cart_id))?;
                encode(&cart)
            }
            EventKind::CartList => encode(&carts.list_carts().await),
            EventKind::CartAddProduct => {
                let p: AddProductPayload = decode(kind, payload)?;
                let cart: Cart = carts
                    .add_product(
                        &CartId::coerce(p.cart_id),
                        &ProductId::coerce(p.product_id),
                        p.quantity,
                    )
                    .await?;
                encode(&cart)
            }
            EventKind::CartRemoveProduct => {
                let p: RemoveProductPayload = decode(kind, payload)?;
                let cart = carts
                    .remove_product(&CartId::coerce(p.cart_id), &ProductId::coerce(p.product_id))
                    .await?;
                encode(&cart)
            }
            EventKind::ProductList => encode(&products.list_products().await),
            EventKind::ProductGet => {
                let ProductRef { product_id } = decode(kind, payload)?;
                let product_id = ProductId::coerce(product_id);
                let product: Product = products
                    .get_product(&product_id)
                    .await
                    .ok_or(StoreError::ProductNotFound(product_id))?;
                encode(&product)
            }
            EventKind::ProductCreate => {
                let input: NewProduct = decode(kind, payload)?;
                encode(&products.create_product(input).await?)
            }
        }
    }

    /// Log a failure and send it to the originating connection only.
    fn report(
        &self,
        origin: &ConnectionId,
        event: &str,
        request_id: Option<String>,
        err: &GatewayError,
    ) {
        if err.is_server_error() {
            let event_id = sentry::capture_error(err);
            tracing::error!(
                error = %err,
                event,
                sentry_event_id = %event_id,
                "event failed"
            );
        } else {
            tracing::warn!(error = %err, event, "event rejected");
        }

        let payload = ErrorPayload {
            event: event.to_owned(),
            code: err.code().to_owned(),
            message: err.client_message(),
        };
        let frame = ServerEnvelope::new(
            ERROR_EVENT,
            serde_json::to_value(&payload).unwrap_or(serde_json::Value::Null),
        )
        .with_request_id(request_id);
        self.inner.connections.send(origin, frame);
    }
}

fn decode<T: DeserializeOwned>(kind: EventKind, payload: serde_json::Value) -> Result<T, GatewayError> {
    serde_json::from_value(payload).map_err(|source| GatewayError::InvalidPayload {
        event: kind.name(),
        source,
    })
}

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, GatewayError> {
    serde_json::to_value(value).map_err(GatewayError::Encode)
}
