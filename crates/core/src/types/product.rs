//! Product documents.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;

/// Errors that can occur when validating a [`NewProduct`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    /// A required text field is empty.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
    /// Price is below zero.
    #[error("price cannot be negative")]
    NegativePrice,
}

/// A catalog product as stored in the durable product file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default)]
    pub thumbnails: Vec<String>,
}

const fn default_status() -> bool {
    true
}

/// Input for creating a product. The store assigns the ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default)]
    pub thumbnails: Vec<String>,
}

impl NewProduct {
    /// Check field-level constraints.
    ///
    /// Code uniqueness is a registry concern and is checked by the store.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError`] if the title or code is blank or the price is
    /// negative.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.title.trim().is_empty() {
            return Err(ProductError::EmptyField("title"));
        }
        if self.code.trim().is_empty() {
            return Err(ProductError::EmptyField("code"));
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ProductError::NegativePrice);
        }
        Ok(())
    }

    /// Attach an ID, producing the stored document.
    #[must_use]
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            title: self.title.trim().to_owned(),
            description: self.description,
            code: self.code.trim().to_owned(),
            price: self.price,
            stock: self.stock,
            category: self.category,
            status: self.status,
            thumbnails: self.thumbnails,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> NewProduct {
        NewProduct {
            title: "Dried Pineapple".to_string(),
            description: "Sun-dried rings".to_string(),
            code: "DP-001".to_string(),
            price: Decimal::new(1299, 2),
            stock: 25,
            category: "snacks".to_string(),
            status: true,
            thumbnails: Vec::new(),
        }
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let mut input = sample();
        input.title = "   ".to_string();
        assert_eq!(input.validate(), Err(ProductError::EmptyField("title")));
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let mut input = sample();
        input.price = Decimal::new(-1, 0);
        assert_eq!(input.validate(), Err(ProductError::NegativePrice));
    }

    #[test]
    fn test_price_accepts_number_or_string() {
        let from_number: Product =
            serde_json::from_str(r#"{"id":"p1","title":"A","code":"A1","price":12.5}"#).unwrap();
        let from_string: Product =
            serde_json::from_str(r#"{"id":"p1","title":"A","code":"A1","price":"12.5"}"#).unwrap();
        assert_eq!(from_number.price, from_string.price);
        assert!(from_number.status);
    }

    #[test]
    fn test_into_product_trims_identity_fields() {
        let mut input = sample();
        input.code = " DP-001 ".to_string();
        let product = input.into_product(ProductId::from("p1"));
        assert_eq!(product.code, "DP-001");
        assert_eq!(product.id.as_str(), "p1");
    }
}
