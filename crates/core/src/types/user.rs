//! Backend user account.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::UserId;

/// A registered user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
}
