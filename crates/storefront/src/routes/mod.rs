//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Redirect to product listing
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (shop API reachable)
//!
//! # Catalog
//! GET  /products?page=N            - Paginated product listing
//! GET  /products/{id}              - Product detail
//! POST /products/{id}/add-to-cart  - Add to cart (requires auth)
//! GET  /search?q=                  - Product search
//!
//! # Cart (requires auth)
//! GET  /cart                       - Cart page
//! POST /cart/update/{product_id}   - Set line quantity
//! POST /cart/remove/{product_id}   - Remove line
//!
//! # Checkout and account (requires auth)
//! GET  /checkout                   - Shipping form
//! POST /checkout                   - Place order
//! GET  /orders                     - Order history
//! GET  /profile                    - Profile page
//! POST /profile                    - Update username/email
//! POST /profile/password           - Change password
//!
//! # Auth
//! GET  /auth/login                 - Login page
//! POST /auth/login                 - Login action
//! GET  /auth/register              - Register page
//! POST /auth/register              - Register action
//! POST /auth/logout                - Logout action
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;
pub mod search;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};
use chrono::Utc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::Session;

use bazaar_core::ProductId;

use crate::error::AppError;
use crate::middleware::{create_session_layer, request_id_middleware};
use crate::models::{CurrentUser, Notice, session_keys};
use crate::state::AppState;

// =============================================================================
// Shared view data
// =============================================================================

/// Navigation state rendered by the base layout.
#[derive(Clone, Default)]
pub struct Nav {
    /// Signed-in username, if any.
    pub username: Option<String>,
}

impl Nav {
    #[must_use]
    pub fn new(user: Option<&CurrentUser>) -> Self {
        Self {
            username: user.map(|u| u.username.clone()),
        }
    }

    #[must_use]
    pub fn signed_in(user: &CurrentUser) -> Self {
        Self::new(Some(user))
    }
}

/// A notice ready for rendering, with the time left before it clears.
#[derive(Clone)]
pub struct NoticeView {
    pub message: String,
    pub clear_after_ms: i64,
}

/// Read the pending notice for `product_id`, dropping it once it has expired.
///
/// A live notice for another product stays in the session untouched.
async fn current_notice(
    session: &Session,
    product_id: ProductId,
) -> Result<Option<NoticeView>, AppError> {
    let Some(notice) = session.get::<Notice>(session_keys::NOTICE).await? else {
        return Ok(None);
    };

    let now = Utc::now();
    if notice.is_expired(now) {
        session.remove::<Notice>(session_keys::NOTICE).await?;
        return Ok(None);
    }
    if !notice.is_for(product_id) {
        return Ok(None);
    }

    Ok(Some(NoticeView {
        clear_after_ms: (notice.expires_at - now).num_milliseconds(),
        message: notice.message,
    }))
}

/// Append a single URL-encoded query parameter to a local path.
fn with_query(path: &str, key: &str, value: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    format!("{path}?{query}")
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/add-to-cart", post(products::add_to_cart))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/update/{product_id}", post(cart::update))
        .route("/remove/{product_id}", post(cart::remove))
}

/// Create all storefront page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .nest("/products", product_routes())
        .route("/search", get(search::search))
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::submit))
        .route("/orders", get(account::orders))
        .route("/profile", get(account::profile).post(account::update_profile))
        .route("/profile/password", post(account::change_password))
        .nest("/auth", auth_routes())
}

/// Build the complete storefront application.
///
/// Layers, outermost first: request tracing span, request ID, session.
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = tracing::field::Empty,
                        )
                    }),
                )
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(session_layer),
        )
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// The storefront has no landing page of its own.
async fn home() -> Redirect {
    Redirect::to("/products")
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the shop API is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.api().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, api = %state.api().base_url(), "Shop API not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_with_query_encodes_value() {
        assert_eq!(
            with_query("/auth/login", "success", "Registered! Please log in."),
            "/auth/login?success=Registered%21+Please+log+in."
        );
    }

    #[test]
    fn test_nav_reflects_identity() {
        assert!(Nav::new(None).username.is_none());

        let user = CurrentUser {
            id: bazaar_core::UserId::new(1),
            username: "ada".to_string(),
            email: bazaar_core::Email::parse("ada@example.com").unwrap(),
        };
        assert_eq!(Nav::signed_in(&user).username.as_deref(), Some("ada"));
    }
}
