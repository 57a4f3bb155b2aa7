//! Product store.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cartwire_core::{NewProduct, Product, ProductId};
use tracing::instrument;

use super::{FileStore, LoadOutcome, StoreError};

/// File-backed product catalog.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct ProductStore {
    inner: Arc<FileStore<Product>>,
}

impl ProductStore {
    /// Create a store backed by the JSON file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FileStore::new(path)),
        }
    }

    /// Path of the durable product file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Whether the last load succeeded.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }

    /// Load the product file. See [`FileStore::initialize`].
    ///
    /// # Errors
    ///
    /// Returns the load error after logging it.
    pub async fn initialize(&self) -> Result<LoadOutcome, StoreError> {
        self.inner.initialize().await
    }

    /// Look up a product. The input is coerced to the canonical key.
    pub async fn get_product(&self, product_id: impl Display) -> Option<Product> {
        self.inner.get(&ProductId::coerce(product_id)).await
    }

    /// Whether the product exists.
    pub async fn contains(&self, product_id: &ProductId) -> bool {
        self.inner.contains(product_id).await
    }

    /// All products in registry order.
    pub async fn list_products(&self) -> Vec<Product> {
        self.inner.list().await
    }

    /// Validate and persist a new product with the next `p<N+1>` id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Product`] for invalid fields,
    /// [`StoreError::DuplicateCode`] if the code is taken, or a persist error.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product, StoreError> {
        input.validate()?;

        let product = self
            .inner
            .mutate(|registry| {
                let code = input.code.trim();
                if registry.iter().any(|p| p.code == code) {
                    return Err(StoreError::DuplicateCode(code.to_owned()));
                }
                let product = input.into_product(registry.next_id(ProductId::from_sequence));
                registry.upsert(product.clone());
                Ok(product)
            })
            .await?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Write the whole catalog to disk.
    ///
    /// # Errors
    ///
    /// Returns the persist error after logging it.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.inner.flush().await
    }
}
