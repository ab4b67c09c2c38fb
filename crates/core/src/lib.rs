//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types used by the storefront and its tests:
//! products, carts, orders, users and the small amount of client-side logic
//! that goes with them (pagination bounds, cart totals, response sequencing).
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no sessions. This keeps it lightweight and easy to test.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices and the catalog/cart/order models

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
