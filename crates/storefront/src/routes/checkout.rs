//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use bazaar_core::ShippingAddress;

use super::Nav;
use super::cart::CartView;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub nav: Nav,
    pub cart: Option<CartView>,
    pub address: ShippingAddress,
    pub error: Option<String>,
}

/// Display the shipping form with a cart summary.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    let cart = match state.cart_service().fetch(&user).await {
        Ok(cart) => Some(CartView::from(&cart)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load cart summary for checkout");
            None
        }
    };

    CheckoutTemplate {
        nav: Nav::signed_in(&user),
        cart,
        address: ShippingAddress::default(),
        error: None,
    }
}

/// Place the order and continue to order history.
///
/// Only required-field presence is checked before submitting.
#[instrument(skip(state, user, address), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(address): Form<ShippingAddress>,
) -> Response {
    let nav = Nav::signed_in(&user);

    let missing = address.missing_fields();
    if !missing.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            CheckoutTemplate {
                nav,
                cart: None,
                error: Some(format!("Please fill in: {}", missing.join(", "))),
                address,
            },
        )
            .into_response();
    }

    match state.api().checkout(&user, &address.trimmed()).await {
        Ok(order) => {
            let order_id = order.id.to_string();
            add_breadcrumb("checkout", "Order placed", &[("order_id", order_id.as_str())]);
            tracing::info!(order_id = %order.id, "Order placed");
            Redirect::to("/orders").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Checkout failed");
            (
                e.rejection_status(),
                CheckoutTemplate {
                    nav,
                    cart: None,
                    error: Some(e.user_message("Checkout failed")),
                    address,
                },
            )
                .into_response()
        }
    }
}
