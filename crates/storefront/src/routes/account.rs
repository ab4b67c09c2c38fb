//! Account route handlers: order history and profile.
//!
//! The profile page carries two independent forms. Each submission reports
//! only its own outcome; the other form's message slot stays empty.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{Email, Order, OrderItem, Price};

use super::Nav;
use crate::api::types::{PasswordChange, ProfileUpdate};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{AuthContext, RequireAuth};
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// Orders
// =============================================================================

/// Order line display data.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub quantity: i64,
    pub price: String,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            name: item.name.clone(),
            quantity: item.quantity,
            price: Price::from_amount(item.price).display(),
        }
    }
}

/// Order display data.
#[derive(Clone)]
pub struct OrderView {
    pub id: i64,
    pub date: String,
    pub total: String,
    pub items: Vec<OrderItemView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i64(),
            date: order.created_at.format("%B %-d, %Y").to_string(),
            total: order.total().display(),
            items: order.items.iter().map(OrderItemView::from).collect(),
        }
    }
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub nav: Nav,
    pub orders: Vec<OrderView>,
    pub error: Option<String>,
}

/// Display order history.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn orders(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    let nav = Nav::signed_in(&user);
    match state.api().list_orders(&user).await {
        Ok(orders) => OrdersTemplate {
            nav,
            orders: orders.iter().map(OrderView::from).collect(),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load orders");
            OrdersTemplate {
                nav,
                orders: Vec::new(),
                error: Some(e.user_message("Failed to load orders")),
            }
        }
    }
}

// =============================================================================
// Profile
// =============================================================================

/// Outcome of one profile form submission.
#[derive(Clone)]
pub struct FormMessage {
    pub text: String,
    pub is_error: bool,
}

impl FormMessage {
    fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Profile update form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
}

/// Password change form data.
#[derive(Deserialize)]
pub struct PasswordForm {
    pub old_password: String,
    pub new_password: String,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub username: String,
    pub email: String,
    pub load_error: Option<String>,
    pub profile_message: Option<FormMessage>,
    pub password_message: Option<FormMessage>,
}

/// Build the profile page from a fresh profile fetch.
///
/// If the fetch fails, the session's copy of the identity is shown instead.
async fn render_profile(
    state: &AppState,
    user: &CurrentUser,
    profile_message: Option<FormMessage>,
    password_message: Option<FormMessage>,
) -> ProfileTemplate {
    let (username, email, load_error) = match state.api().get_profile(user).await {
        Ok(profile) => (profile.username, profile.email.into_inner(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load profile");
            (
                user.username.clone(),
                user.email.to_string(),
                Some(e.user_message("Failed to load profile")),
            )
        }
    };

    ProfileTemplate {
        nav: Nav::signed_in(user),
        username,
        email,
        load_error,
        profile_message,
        password_message,
    }
}

/// Display the profile page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    render_profile(&state, &user, None, None).await
}

/// Update username and email.
///
/// On success the session identity picks up the new details.
#[instrument(skip(state, user, auth, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut auth: AuthContext,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim().to_string();
    if username.is_empty() {
        let message = FormMessage::error("Username is required");
        let page = render_profile(&state, &user, Some(message), None).await;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            let message = FormMessage::error(format!("Invalid email: {e}"));
            let page = render_profile(&state, &user, Some(message), None).await;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let update = ProfileUpdate {
        username: username.clone(),
        email: email.to_string(),
    };

    let (status, message) = match state.api().update_profile(&user, &update).await {
        Ok(ack) => {
            auth.refresh(CurrentUser {
                id: user.id,
                username,
                email,
            })
            .await?;
            (
                StatusCode::OK,
                FormMessage::success(
                    ack.unwrap_or_else(|| "Profile updated successfully".to_string()),
                ),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Profile update failed");
            (
                e.rejection_status(),
                FormMessage::error(e.user_message("Failed to update profile")),
            )
        }
    };

    let current = auth.current_user().cloned().unwrap_or(user);
    let page = render_profile(&state, &current, Some(message), None).await;
    Ok((status, page).into_response())
}

/// Change the user's password.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PasswordForm>,
) -> Response {
    let (status, message) = if form.new_password.is_empty() {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            FormMessage::error("New password is required"),
        )
    } else {
        let change = PasswordChange {
            old_password: form.old_password,
            new_password: form.new_password,
        };
        match state.api().change_password(&user, &change).await {
            Ok(ack) => (
                StatusCode::OK,
                FormMessage::success(
                    ack.unwrap_or_else(|| "Password changed successfully".to_string()),
                ),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Password change failed");
                (
                    e.rejection_status(),
                    FormMessage::error(e.user_message("Failed to change password")),
                )
            }
        }
    };

    let page = render_profile(&state, &user, None, Some(message)).await;
    (status, page).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_view_formats_date_and_total() {
        let order: Order = serde_json::from_str(
            r#"{
                "id": 4,
                "created_at": "2026-03-01T12:00:00Z",
                "total_price": 35.0,
                "items": [{"product_id": 1, "name": "Mug", "quantity": 3, "price": 10.0}]
            }"#,
        )
        .unwrap();

        let view = OrderView::from(&order);
        assert_eq!(view.date, "March 1, 2026");
        assert_eq!(view.total, "$35.00");
        assert_eq!(view.items[0].price, "$10.00");
    }
}
