//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use bazaar_core::{Email, User, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user. The
/// `id` is what every authenticated API call sends as its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user ID.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// User's email address.
    pub email: Email,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// Session keys for storefront state.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the pagination metadata of the last product page shown.
    pub const PRODUCT_PAGINATION: &str = "product_pagination";

    /// Key for the transient notice shown on the next page view.
    pub const NOTICE: &str = "notice";
}
