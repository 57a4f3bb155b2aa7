//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use cartwire_core::{NewProduct, Product, ProductId};
use tracing::instrument;

use crate::error::Result;
use crate::gateway::EventKind;
use crate::state::AppState;
use crate::store::StoreError;

/// List the catalog.
pub async fn list(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.products().list_products().await)
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>> {
    let product_id = ProductId::coerce(product_id);
    let product = state
        .products()
        .get_product(&product_id)
        .await
        .ok_or(StoreError::ProductNotFound(product_id))?;
    Ok(Json(product))
}

/// Create a product and announce it to live clients.
#[instrument(skip_all, fields(code))]
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let Json(input) = payload?;
    tracing::Span::current().record("code", input.code.as_str());
    let products = state.products().clone();
    let product = state
        .gateway()
        .publish(EventKind::ProductCreate, || async move {
            products.create_product(input).await
        })
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}
