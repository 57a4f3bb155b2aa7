//! Core types for Cartwire.
//!
//! This module provides type-safe wrappers for the documents held by the
//! cart and product stores.

pub mod cart;
pub mod id;
pub mod product;

pub use cart::{Cart, CartError, CartLine};
pub use id::*;
pub use product::{NewProduct, Product, ProductError};
