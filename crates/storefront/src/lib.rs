//! Cartwire storefront library.
//!
//! File-backed cart and product stores, the real-time gateway that fans
//! store changes out to live connections, and the HTTP surface over both.
//! The `cartwire-storefront` binary wires these together; the CLI and the
//! integration tests use them directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod state;
pub mod store;
