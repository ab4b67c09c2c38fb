//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod pagination;
pub mod price;
pub mod product;
pub mod sequence;
pub mod user;

pub use cart::{Cart, CartItem, CartOverflow};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderItem, ShippingAddress};
pub use pagination::{PageOutOfRange, Pagination, resolve_page};
pub use price::{CurrencyCode, Price};
pub use product::Product;
pub use sequence::{ApplyOutcome, Resolved, SequenceToken, SnapshotSequencer};
pub use user::User;
