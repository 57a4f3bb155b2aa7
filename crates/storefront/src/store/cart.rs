//! Cart store.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cartwire_core::{Cart, CartId, ProductId};
use tracing::instrument;

use super::{FileStore, LoadOutcome, ProductStore, StoreError};

/// File-backed cart registry.
///
/// Cart ids are `c<N+1>` where N is the number of carts at creation time
/// (skipping forward if a loaded file already uses that id). Carts are never
/// deleted, so ids are never reused. Product references are
/// checked against the [`ProductStore`] before they are added to a cart.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<FileStore<Cart>>,
    products: ProductStore,
}

impl CartStore {
    /// Create a store backed by the JSON file at `path`.
    pub fn new(path: impl Into<PathBuf>, products: ProductStore) -> Self {
        Self {
            inner: Arc::new(FileStore::new(path)),
            products,
        }
    }

    /// Path of the durable cart file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Whether the last load succeeded.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }

    /// Load the cart file. See [`FileStore::initialize`].
    ///
    /// # Errors
    ///
    /// Returns the load error after logging it.
    pub async fn initialize(&self) -> Result<LoadOutcome, StoreError> {
        self.inner.initialize().await
    }

    /// Look up a cart. The input is coerced to the canonical key, so `" c1"`
    /// finds `c1`. Unknown ids return `None`.
    pub async fn get_cart(&self, cart_id: impl Display) -> Option<Cart> {
        self.inner.get(&CartId::coerce(cart_id)).await
    }

    /// All carts in registry order.
    pub async fn list_carts(&self) -> Vec<Cart> {
        self.inner.list().await
    }

    /// Number of carts.
    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    /// Whether there are no carts.
    pub async fn is_empty(&self) -> bool {
        self.inner.is_empty().await
    }

    /// Allocate, insert and persist a new empty cart.
    ///
    /// # Errors
    ///
    /// Returns a persist error; the cart is not kept in memory in that case.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<Cart, StoreError> {
        let cart = self
            .inner
            .mutate(|registry| {
                let cart = Cart::new(registry.next_id(CartId::from_sequence));
                registry.upsert(cart.clone());
                Ok(cart)
            })
            .await?;

        tracing::info!(cart_id = %cart.id, "cart created");
        Ok(cart)
    }

    /// Add `quantity` units of a product to a cart and persist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProductNotFound`], [`StoreError::CartNotFound`],
    /// an invalid-quantity error, or a persist error.
    #[instrument(skip_all, fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn add_product(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, StoreError> {
        if !self.products.contains(product_id).await {
            return Err(StoreError::ProductNotFound(product_id.clone()));
        }

        let cart = self
            .inner
            .mutate(|registry| {
                let cart = registry
                    .get_mut(cart_id)
                    .ok_or_else(|| StoreError::CartNotFound(cart_id.clone()))?;
                cart.add_product(product_id.clone(), quantity)?;
                Ok(cart.clone())
            })
            .await?;

        tracing::info!(quantity, "product added to cart");
        Ok(cart)
    }

    /// Remove every line for a product from a cart and persist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CartNotFound`], a not-in-cart error, or a persist
    /// error.
    #[instrument(skip_all, fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn remove_product(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
    ) -> Result<Cart, StoreError> {
        let cart = self
            .inner
            .mutate(|registry| {
                let cart = registry
                    .get_mut(cart_id)
                    .ok_or_else(|| StoreError::CartNotFound(cart_id.clone()))?;
                cart.remove_product(product_id)?;
                Ok(cart.clone())
            })
            .await?;

        tracing::info!("product removed from cart");
        Ok(cart)
    }

    /// Write the whole registry to disk.
    ///
    /// # Errors
    ///
    /// Returns the persist error after logging it.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.inner.flush().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use cartwire_core::NewProduct;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    async fn stores(dir: &TempDir) -> CartStore {
        let products = ProductStore::new(dir.path().join("products.json"));
        for code in ["A", "B"] {
            products
                .create_product(NewProduct {
                    title: format!("Product {code}"),
                    description: String::new(),
                    code: code.to_string(),
                    price: Decimal::ONE,
                    stock: 10,
                    category: String::new(),
                    status: true,
                    thumbnails: Vec::new(),
                })
                .await
                .unwrap();
        }
        CartStore::new(dir.path().join("carts.json"), products)
    }

    fn persisted(store: &CartStore) -> Vec<Cart> {
        let raw = std::fs::read_to_string(store.path()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_cart_ids_are_monotonic() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(store.create_cart().await.unwrap().id.to_string());
        }
        assert_eq!(ids, ["c1", "c2", "c3", "c4", "c5"]);
        assert_eq!(persisted(&store).len(), 5);
    }

    #[tokio::test]
    async fn test_create_cart_continues_after_loaded_carts() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;
        std::fs::write(
            store.path(),
            r#"[{"id":"c1","products":[]},{"id":"c2","products":[]}]"#,
        )
        .unwrap();
        store.initialize().await.unwrap();

        let cart = store.create_cart().await.unwrap();
        assert_eq!(cart.id.as_str(), "c3");
        assert!(cart.products.is_empty());
    }

    #[tokio::test]
    async fn test_create_cart_skips_taken_id() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;
        std::fs::write(
            store.path(),
            r#"[{"id":"c1","products":[]},{"id":"c3","products":[]}]"#,
        )
        .unwrap();
        store.initialize().await.unwrap();

        assert_eq!(store.create_cart().await.unwrap().id.as_str(), "c4");
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_get_cart_coerces_and_misses() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;
        store.create_cart().await.unwrap();

        assert!(store.get_cart(" c1 ").await.is_some());
        assert!(store.get_cart("c2").await.is_none());
        assert!(store.get_cart(1).await.is_none());
    }

    #[tokio::test]
    async fn test_add_product_persists() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;
        let cart = store.create_cart().await.unwrap();

        let cart = store
            .add_product(&cart.id, &ProductId::from("p1"), 2)
            .await
            .unwrap();
        assert_eq!(cart.products.len(), 1);
        assert_eq!(persisted(&store)[0], cart);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;
        let cart = store.create_cart().await.unwrap();

        let err = store
            .add_product(&cart.id, &ProductId::from("p99"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_add_to_unknown_cart_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;

        let err = store
            .add_product(&CartId::from("c7"), &ProductId::from("p1"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CartNotFound(_)));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;
        let cart_id = store.create_cart().await.unwrap().id;

        let (p1, p2) = (ProductId::from("p1"), ProductId::from("p2"));
        let (a, b) = tokio::join!(
            store.add_product(&cart_id, &p1, 1),
            store.add_product(&cart_id, &p2, 1),
        );
        a.unwrap();
        b.unwrap();

        let on_disk = persisted(&store);
        let mut product_ids: Vec<_> = on_disk[0]
            .products
            .iter()
            .map(|line| line.product_id.to_string())
            .collect();
        product_ids.sort();
        assert_eq!(product_ids, ["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_concurrent_adds_across_tasks() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;
        let cart_id = store.create_cart().await.unwrap().id;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let cart_id = cart_id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add_product(&cart_id, &ProductId::from("p1"), 1)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(persisted(&store)[0].products[0].quantity, 20);
    }

    #[tokio::test]
    async fn test_remove_product() {
        let dir = TempDir::new().unwrap();
        let store = stores(&dir).await;
        let cart_id = store.create_cart().await.unwrap().id;
        store
            .add_product(&cart_id, &ProductId::from("p1"), 1)
            .await
            .unwrap();

        let cart = store
            .remove_product(&cart_id, &ProductId::from("p1"))
            .await
            .unwrap();
        assert!(cart.products.is_empty());

        let err = store
            .remove_product(&cart_id, &ProductId::from("p1"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_in_cart");
    }
}
