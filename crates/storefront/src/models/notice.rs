//! Transient notices that clear themselves after a fixed delay.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::ProductId;

/// A message about one product, shown on its page until it expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub product_id: ProductId,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

impl Notice {
    /// Create a notice for `product_id` that expires `ttl` after `now`.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        message: impl Into<String>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        Self {
            product_id,
            message: message.into(),
            expires_at: now + ttl,
        }
    }

    #[must_use]
    pub fn is_for(&self, product_id: ProductId) -> bool {
        self.product_id == product_id
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_expires_after_ttl() {
        let now = Utc::now();
        let notice = Notice::new(ProductId::new(1), "Added to cart", Duration::from_secs(3), now);

        assert!(!notice.is_expired(now));
        assert!(!notice.is_expired(now + chrono::Duration::milliseconds(2_999)));
        assert!(notice.is_expired(now + chrono::Duration::seconds(3)));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let now = Utc::now();
        assert!(Notice::new(ProductId::new(1), "gone", Duration::ZERO, now).is_expired(now));
    }

    #[test]
    fn test_notice_belongs_to_one_product() {
        let notice = Notice::new(ProductId::new(1), "Added to cart", Duration::from_secs(3), Utc::now());
        assert!(notice.is_for(ProductId::new(1)));
        assert!(!notice.is_for(ProductId::new(2)));
    }
}
