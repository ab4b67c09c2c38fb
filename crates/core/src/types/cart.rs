//! Shopping cart model.
//!
//! The cart total is never stored: it is derived from the line items every
//! time it is asked for. A `total` sent by the backend is ignored on
//! deserialization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;
use super::price::Price;

/// A cart sum that does not fit the numeric range.
///
/// Quantities are stored exactly as the backend reports them, so a line can
/// hold any `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cart totals are out of range")]
pub struct CartOverflow;

/// One line of a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Product name at the time the line was read.
    pub name: String,
    /// Unit price snapshot.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Quantity as stored by the backend.
    pub quantity: i64,
}

impl CartItem {
    /// Price × quantity for this line.
    ///
    /// # Errors
    ///
    /// Returns [`CartOverflow`] if the product does not fit a `Decimal`.
    pub fn line_total(&self) -> Result<Decimal, CartOverflow> {
        self.price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or(CartOverflow)
    }
}

/// An ordered collection of cart lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    items: Vec<CartItem>,
}

impl Cart {
    /// Build a cart from its lines, preserving order.
    #[must_use]
    pub const fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// Cart lines in server order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all line quantities.
    ///
    /// # Errors
    ///
    /// Returns [`CartOverflow`] if the sum exceeds `i64`.
    pub fn item_count(&self) -> Result<i64, CartOverflow> {
        self.items
            .iter()
            .try_fold(0_i64, |count, item| count.checked_add(item.quantity))
            .ok_or(CartOverflow)
    }

    /// Sum of price × quantity over all lines, recomputed on every call.
    ///
    /// # Errors
    ///
    /// Returns [`CartOverflow`] if a line total or the sum does not fit a
    /// `Decimal`.
    pub fn total(&self) -> Result<Decimal, CartOverflow> {
        self.items.iter().try_fold(Decimal::ZERO, |total, item| {
            total.checked_add(item.line_total()?).ok_or(CartOverflow)
        })
    }

    /// [`Cart::total`] in the store currency.
    ///
    /// # Errors
    ///
    /// Same as [`Cart::total`].
    pub fn total_price(&self) -> Result<Price, CartOverflow> {
        self.total().map(Price::from_amount)
    }
}
