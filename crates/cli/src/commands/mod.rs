//! Command implementations.

pub mod carts;
pub mod inspect;
pub mod seed;

use std::path::PathBuf;

use cartwire_storefront::config::{ConfigError, StorefrontConfig};
use cartwire_storefront::store::{CartStore, ProductStore, StoreError};
use thiserror::Error;

/// Errors a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed file {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),
}

/// Data file locations, from the environment unless overridden.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub carts: PathBuf,
    pub products: PathBuf,
}

impl DataPaths {
    /// Resolve paths from `CARTWIRE_*` variables (and `.env`), applying the
    /// command-line overrides on top.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the environment is invalid.
    pub fn resolve(carts: Option<PathBuf>, products: Option<PathBuf>) -> Result<Self, CliError> {
        let config = StorefrontConfig::from_env()?;
        Ok(Self {
            carts: carts.unwrap_or(config.carts_path),
            products: products.unwrap_or(config.products_path),
        })
    }

    /// Open and load both stores. A file that fails to load is an error here,
    /// unlike in the server: the CLI must not overwrite data it could not read.
    ///
    /// # Errors
    ///
    /// Returns the load error of either store.
    pub async fn open(&self) -> Result<(CartStore, ProductStore), CliError> {
        let products = ProductStore::new(&self.products);
        products.initialize().await?;
        let carts = CartStore::new(&self.carts, products.clone());
        carts.initialize().await?;
        Ok((carts, products))
    }
}
