//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness check
//! GET    /health/ready                        - Readiness (both stores loaded)
//! GET    /ws                                  - Real-time gateway (WebSocket)
//!
//! # Carts
//! GET    /api/carts                           - Cart listing
//! POST   /api/carts                           - Create cart (broadcasts cart:created)
//! GET    /api/carts/{cid}                     - Cart detail
//! POST   /api/carts/{cid}/products/{pid}      - Add product (broadcasts cart:updated)
//! DELETE /api/carts/{cid}/products/{pid}      - Remove product (broadcasts cart:updated)
//!
//! # Products
//! GET    /api/products                        - Product listing
//! POST   /api/products                        - Create product (broadcasts product:created)
//! GET    /api/products/{pid}                  - Product detail
//! ```

pub mod carts;
pub mod products;
pub mod ws;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/carts", get(carts::list).post(carts::create))
        .route("/carts/{cid}", get(carts::show))
        .route(
            "/carts/{cid}/products/{pid}",
            post(carts::add_product).delete(carts::remove_product),
        )
        .route("/products", get(products::list).post(products::create))
        .route("/products/{pid}", get(products::show))
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/ws", get(ws::upgrade))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if either durable file failed to load.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
