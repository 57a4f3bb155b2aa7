//! Cart route handlers.
//!
//! Mutations run through the gateway so live clients receive the same
//! `cart:created` / `cart:updated` broadcasts as for real-time requests.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use cartwire_core::{Cart, CartId, ProductId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::gateway::EventKind;
use crate::state::AppState;
use crate::store::StoreError;

/// Body for adding a product to a cart.
#[derive(Debug, Default, Deserialize)]
pub struct AddProductBody {
    pub quantity: Option<u32>,
}

/// List all carts.
pub async fn list(State(state): State<AppState>) -> Json<Vec<Cart>> {
    Json(state.carts().list_carts().await)
}

/// Create an empty cart.
#[instrument(skip(state))]
pub async fn create(State(state): State<AppState>) -> Result<(StatusCode, Json<Cart>)> {
    let carts = state.carts().clone();
    let cart = state
        .gateway()
        .publish(EventKind::CartCreate, || async move { carts.create_cart().await })
        .await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

/// Show one cart.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(cart_id): Path<String>) -> Result<Json<Cart>> {
    let cart_id = CartId::coerce(cart_id);
    let cart = state
        .carts()
        .get_cart(&cart_id)
        .await
        .ok_or(StoreError::CartNotFound(cart_id))?;
    Ok(Json(cart))
}

/// Add a product to a cart. Quantity defaults to 1.
#[instrument(skip(state, body))]
pub async fn add_product(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(String, String)>,
    body: std::result::Result<Option<Json<AddProductBody>>, JsonRejection>,
) -> Result<Json<Cart>> {
    let quantity = body?.and_then(|Json(b)| b.quantity).unwrap_or(1);
    let cart_id = CartId::coerce(cart_id);
    let product_id = ProductId::coerce(product_id);
    let carts = state.carts().clone();

    let cart = state
        .gateway()
        .publish(EventKind::CartAddProduct, || async move {
            carts.add_product(&cart_id, &product_id, quantity).await
        })
        .await?;
    Ok(Json(cart))
}

/// Remove every line for a product from a cart.
#[instrument(skip(state))]
pub async fn remove_product(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(String, String)>,
) -> Result<Json<Cart>> {
    let cart_id = CartId::coerce(cart_id);
    let product_id = ProductId::coerce(product_id);
    let carts = state.carts().clone();

    let cart = state
        .gateway()
        .publish(EventKind::CartRemoveProduct, || async move {
            carts.remove_product(&cart_id, &product_id).await
        })
        .await?;
    Ok(Json(cart))
}
