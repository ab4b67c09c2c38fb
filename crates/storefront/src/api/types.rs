//! Wire types for the shop REST API.
//!
//! Response envelopes wrap the core domain types; request bodies mirror the
//! JSON the backend expects. Both directions derive `Serialize` and
//! `Deserialize` so test doubles can speak the same protocol.

use serde::{Deserialize, Serialize};

use bazaar_core::{Order, Pagination, Product, ProductId, User};

// =============================================================================
// Responses
// =============================================================================

/// One page of the product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// `{"product": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEnvelope {
    pub product: Product,
}

/// `{"products": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductList {
    #[serde(default)]
    pub products: Vec<Product>,
}

/// `{"user": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}

/// Successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: User,
}

/// `{"order": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEnvelope {
    pub order: Order,
}

/// `{"orders": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderList {
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// Body of acknowledgements and error responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Requests
// =============================================================================

/// `POST /cart/add`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// `PUT /cart/update/{product_id}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// `PUT /profile`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
}

/// `POST /profile/change-password`
#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

/// `POST /login`
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /register`
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_page_flattens_pagination() {
        let page: ProductPage = serde_json::from_str(
            r#"{
                "products": [{"id": 1, "name": "Mug", "description": "Blue", "price": 9.5}],
                "current_page": 1,
                "total_pages": 4,
                "has_next": true,
                "has_prev": false
            }"#,
        )
        .unwrap();

        assert_eq!(page.products.len(), 1);
        assert_eq!(page.pagination.total_pages, 4);
        assert!(page.pagination.is_consistent_with(1));
    }

    #[test]
    fn test_message_body_tolerates_missing_message() {
        let body: MessageBody = serde_json::from_str("{}").unwrap();
        assert!(body.message.is_none());
    }
}
