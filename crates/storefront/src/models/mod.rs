//! Session-side models for the storefront.

pub mod notice;
pub mod session;

pub use notice::Notice;
pub use session::{CurrentUser, keys as session_keys};
