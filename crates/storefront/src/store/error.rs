//! Store error types.

use std::path::PathBuf;

use cartwire_core::{CartError, CartId, ProductError, ProductId};
use thiserror::Error;

/// Errors returned by the cart and product stores.
///
/// Storage kinds (`Read`, `Parse`, `NotAnArray`, `Serialize`, `Persist`) come
/// from the durable file. The rest are validation failures caused by the
/// request and are safe to show to the client.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} does not contain a JSON array", path.display())]
    NotAnArray { path: PathBuf },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to persist {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cart {0} not found")]
    CartNotFound(CartId),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("product code {0} already exists")]
    DuplicateCode(String),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Product(#[from] ProductError),
}

impl StoreError {
    /// Whether the error was caused by the request rather than storage.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::Read { .. }
                | Self::Parse { .. }
                | Self::NotAnArray { .. }
                | Self::Serialize(_)
                | Self::Persist { .. }
        )
    }

    /// Stable machine-readable code for clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Read { .. }
            | Self::Parse { .. }
            | Self::NotAnArray { .. }
            | Self::Serialize(_)
            | Self::Persist { .. } => "storage",
            Self::CartNotFound(_) => "cart_not_found",
            Self::ProductNotFound(_) => "product_not_found",
            Self::Cart(CartError::NotInCart(_)) => "not_in_cart",
            Self::Cart(CartError::InvalidQuantity(_)) => "invalid_quantity",
            Self::DuplicateCode(_) | Self::Product(_) => "invalid_product",
        }
    }
}
