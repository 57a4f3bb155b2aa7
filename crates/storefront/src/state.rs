//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::gateway::Gateway;
use crate::store::{CartStore, ProductStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// stores, the real-time gateway and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    gateway: Gateway,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the product store, the cart store on top of it, and the gateway
    /// over both. Stores are not loaded here; call [`AppState::initialize`].
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let products = ProductStore::new(&config.products_path);
        let carts = CartStore::new(&config.carts_path, products.clone());
        let gateway = Gateway::new(carts, products, config.outbound_buffer);

        Self {
            inner: Arc::new(AppStateInner { config, gateway }),
        }
    }

    /// Load both durable files.
    ///
    /// A failed load is logged by the store and leaves it empty and unhealthy;
    /// the server keeps running so the readiness probe can report it.
    pub async fn initialize(&self) {
        let _ = self.products().initialize().await;
        let _ = self.carts().initialize().await;
    }

    /// Whether both stores loaded cleanly.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.products().is_healthy() && self.carts().is_healthy()
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the real-time gateway.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        self.inner.gateway.carts()
    }

    /// Get a reference to the product store.
    #[must_use]
    pub fn products(&self) -> &ProductStore {
        self.inner.gateway.products()
    }
}
