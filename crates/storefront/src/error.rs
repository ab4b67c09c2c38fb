//! Storefront-wide error type with Sentry integration.
//!
//! Views turn shop API failures into on-page messages themselves. `AppError`
//! covers what a view cannot recover from (session store failures, a missing
//! middleware layer) and renders a generic response without leaking internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::CurrentUser;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let event_id = sentry::capture_error(&self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Request error"
        );

        // Don't expose internal error details to clients
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// Tag Sentry events from this scope with the signed-in user.
pub fn set_sentry_user(user: &CurrentUser) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            username: Some(user.username.clone()),
            email: Some(user.email.to_string()),
            ..Default::default()
        }));
    });
}

/// Stop tagging Sentry events with a user (on logout).
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

/// Record a shopper action as a Sentry breadcrumb.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Updated quantity", &[("product_id", "3")]);
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        data: data
            .iter()
            .map(|(key, value)| {
                (
                    (*key).to_string(),
                    serde_json::Value::String((*value).to_string()),
                )
            })
            .collect(),
        ..Default::default()
    });
}
