//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Cart fetch/mutate round trips with latest-wins ordering

pub mod cart;

pub use cart::{CartService, CartSyncRegistry};
