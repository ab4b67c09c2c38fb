//! Orders and the checkout shipping form.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId};
use super::price::Price;

/// A line item on a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// An order created at checkout. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    /// Total charged, as recorded by the backend.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    #[must_use]
    pub fn total(&self) -> Price {
        Price::from_amount(self.total_price)
    }
}

/// Shipping details collected by the checkout form.
///
/// Serializes to the field names the backend's checkout endpoint expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(rename = "shipping_address")]
    pub address: String,
    #[serde(rename = "shipping_city")]
    pub city: String,
    #[serde(rename = "shipping_postal_code")]
    pub postal_code: String,
    #[serde(rename = "shipping_country")]
    pub country: String,
}

impl ShippingAddress {
    /// Labels of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("Address", &self.address),
            ("City", &self.city),
            ("Postal code", &self.postal_code),
            ("Country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(label, _)| label)
        .collect()
    }

    /// Copy with surrounding whitespace removed from every field.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }
}
