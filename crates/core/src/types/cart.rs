//! Cart documents.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{CartId, ProductId};

/// Errors raised by in-memory cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Line quantities must be at least one.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(u32),
    /// The cart has no line for the product.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
}

/// One line of a cart: a product reference and how many units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A shopping cart as stored in the durable cart file.
///
/// Line order is display order. Duplicate `productId` entries coming from the
/// file are accepted as-is; [`Cart::add_product`] merges into the first
/// matching line so new duplicates are never introduced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub products: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new(id: CartId) -> Self {
        Self {
            id,
            products: Vec::new(),
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity` is zero.
    pub fn add_product(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        match self
            .products
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.products.push(CartLine {
                product_id,
                quantity,
            }),
        }
        Ok(())
    }

    /// Remove every line for a product.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the cart has no line for it.
    pub fn remove_product(&mut self, product_id: &ProductId) -> Result<(), CartError> {
        let before = self.products.len();
        self.products.retain(|line| &line.product_id != product_id);
        if self.products.len() == before {
            return Err(CartError::NotInCart(product_id.clone()));
        }
        Ok(())
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.products.iter().map(|line| u64::from(line.quantity)).sum()
    }
}
