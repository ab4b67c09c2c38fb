//! Cart route handlers.
//!
//! The cart lives on the shop API. Every change is followed by a full
//! re-fetch through [`CartService`](crate::services::CartService), and the
//! page renders whatever snapshot that fetch settles on.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{Cart, CartItem, CartOverflow, Price, ProductId};

use super::{Nav, with_query};
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    /// Quantity submitted by the "-" control. May reach zero or below.
    pub decrement_to: i64,
    pub increment_to: i64,
    pub price: String,
    /// `None` when price × quantity is out of range.
    pub line_price: Option<String>,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.as_i64(),
            name: item.name.clone(),
            quantity: item.quantity,
            decrement_to: item.quantity.saturating_sub(1),
            increment_to: item.quantity.saturating_add(1),
            price: Price::from_amount(item.price).display(),
            line_price: item
                .line_total()
                .ok()
                .map(|amount| Price::from_amount(amount).display()),
        }
    }
}

/// Recomputed cart sums.
#[derive(Clone)]
pub struct CartTotals {
    pub total: String,
    pub item_count: i64,
}

impl TryFrom<&Cart> for CartTotals {
    type Error = CartOverflow;

    fn try_from(cart: &Cart) -> Result<Self, Self::Error> {
        Ok(Self {
            total: cart.total_price()?.display(),
            item_count: cart.item_count()?,
        })
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    /// `None` when the quantities are too large to sum. The lines still
    /// render so they can be lowered or removed.
    pub totals: Option<CartTotals>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let totals = match CartTotals::try_from(cart) {
            Ok(totals) => Some(totals),
            Err(e) => {
                tracing::warn!(error = %e, lines = cart.items().len(), "Cart totals not computable");
                None
            }
        };
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            totals,
        }
    }
}

/// Quantity update form data.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityForm {
    pub quantity: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub error: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub nav: Nav,
    pub cart: Option<CartView>,
    pub error: Option<String>,
}

/// Render the page for the outcome of a cart operation.
///
/// On failure the newest snapshot this process has seen for the user is
/// shown alongside the error.
fn render(
    state: &AppState,
    user: &CurrentUser,
    result: Result<Cart, crate::api::ApiError>,
    fallback: &str,
) -> CartTemplate {
    let nav = Nav::signed_in(user);
    match result {
        Ok(cart) => CartTemplate {
            nav,
            cart: Some(CartView::from(&cart)),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user.id, "{fallback}");
            CartTemplate {
                nav,
                cart: state.carts().latest(user.id).as_ref().map(CartView::from),
                error: Some(e.user_message(fallback)),
            }
        }
    }
}

/// Display cart page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<CartQuery>,
) -> impl IntoResponse {
    let result = state.cart_service().fetch(&user).await;
    let mut template = render(&state, &user, result, "Failed to load cart");
    if template.error.is_none() {
        template.error = query.error;
    }
    template
}

/// Set one line's quantity and render the re-fetched cart.
///
/// The quantity is forwarded as submitted, including values below 1.
#[instrument(skip(state, user, form), fields(user_id = %user.id, product_id = %product_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Form(form): Form<UpdateQuantityForm>,
) -> Response {
    let Ok(quantity) = form.quantity.trim().parse::<i64>() else {
        return Redirect::to(&with_query("/cart", "error", "Invalid quantity")).into_response();
    };

    let id_value = product_id.to_string();
    add_breadcrumb("cart", "Updated quantity", &[("product_id", id_value.as_str())]);

    let result = state
        .cart_service()
        .update_quantity(&user, product_id, quantity)
        .await;
    render(&state, &user, result, "Failed to update cart").into_response()
}

/// Remove one line and render the re-fetched cart.
#[instrument(skip(state, user), fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> impl IntoResponse {
    let id_value = product_id.to_string();
    add_breadcrumb("cart", "Removed item", &[("product_id", id_value.as_str())]);

    let result = state.cart_service().remove(&user, product_id).await;
    render(&state, &user, result, "Failed to remove item")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(id: i64, price: i64, quantity: i64) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Item {id}"),
            price: Decimal::from(price),
            quantity,
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let view = CartView::from(&Cart::new(vec![item(1, 10, 2), item(2, 5, 1)]));
        let totals = view.totals.unwrap();
        assert_eq!(totals.total, "$25.00");
        assert_eq!(totals.item_count, 3);
        assert_eq!(view.items[0].line_price.as_deref(), Some("$20.00"));
    }

    #[test]
    fn test_cart_view_keeps_lines_when_totals_overflow() {
        let view = CartView::from(&Cart::new(vec![
            item(1, 10, i64::MAX),
            item(2, 5, i64::MAX),
        ]));
        assert!(view.totals.is_none());
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].increment_to, i64::MAX);
        assert_eq!(view.items[0].decrement_to, i64::MAX - 1);
    }

    #[test]
    fn test_decrement_control_can_reach_zero() {
        let view = CartItemView::from(&item(1, 10, 1));
        assert_eq!(view.decrement_to, 0);
        assert_eq!(view.increment_to, 2);
    }
}
