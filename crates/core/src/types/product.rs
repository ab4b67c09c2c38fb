//! Catalog product as served by the backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product in the catalog.
///
/// Products are read-only from the storefront's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long-form description (may be empty).
    #[serde(default)]
    pub description: String,
    /// Unit price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Image URL, if the product has one.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// Unit price in the store currency.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        Price::from_amount(self.price)
    }
}
