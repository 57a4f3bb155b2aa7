//! Cartwire Core - Shared types library.
//!
//! This crate provides the document types used across all Cartwire components:
//! - `storefront` - Cart/product stores, real-time gateway and HTTP server
//! - `cli` - Command-line tools for inspecting and seeding the data files
//!
//! # Architecture
//!
//! The core crate contains only types and in-memory rules - no I/O, no file
//! access, no networking. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs plus the cart and product documents

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
