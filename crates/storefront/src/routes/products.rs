//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Pagination, Product, ProductId, resolve_page};

use super::{Nav, NoticeView, current_notice, with_query};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{Notice, session_keys};
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.unit_price().display(),
            image_url: product.image_url.clone(),
        }
    }
}

/// Page links for the listing.
#[derive(Clone)]
pub struct PageLinks {
    pub current_page: u32,
    pub total_pages: u32,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl From<&Pagination> for PageLinks {
    fn from(pagination: &Pagination) -> Self {
        Self {
            current_page: pagination.current_page,
            total_pages: pagination.total_pages,
            previous: pagination.previous_page(),
            next: pagination.next_page(),
        }
    }
}

/// Pagination query parameters.
///
/// `page` stays raw so a malformed value gets the listing's own error page.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<String>,
}

impl PaginationQuery {
    /// The requested page number; a missing or blank value means page 1.
    fn page(&self) -> Result<i64, &str> {
        match self.page.as_deref().map(str::trim) {
            None | Some("") => Ok(1),
            Some(raw) => raw.parse().map_err(|_| raw),
        }
    }
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub quantity: Option<String>,
}

impl AddToCartForm {
    /// The requested quantity, raised to at least 1.
    fn quantity(&self) -> i64 {
        self.quantity
            .as_deref()
            .and_then(|q| q.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .max(1)
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub nav: Nav,
    pub products: Vec<ProductView>,
    pub pages: Option<PageLinks>,
    pub error: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub nav: Nav,
    pub product: ProductView,
    pub notice: Option<NoticeView>,
    pub error: Option<String>,
}

/// Product unavailable (not found or failed to load).
#[derive(Template, WebTemplate)]
#[template(path = "products/not_found.html")]
pub struct ProductNotFoundTemplate {
    pub nav: Nav,
    pub message: String,
}

/// Display product listing page.
///
/// A page outside the bounds this session last saw is rejected without
/// contacting the shop API.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<PaginationQuery>,
) -> Result<Response, AppError> {
    let nav = Nav::new(user.as_ref());
    let known = session
        .get::<Pagination>(session_keys::PRODUCT_PAGINATION)
        .await?;

    let resolved = query.page().map_err(str::to_string).and_then(|requested| {
        resolve_page(requested, known.as_ref()).map_err(|e| {
            tracing::debug!(error = %e, "Rejected page change");
            e.requested.to_string()
        })
    });
    let page = match resolved {
        Ok(page) => page,
        Err(requested) => {
            let template = ProductsIndexTemplate {
                nav,
                products: Vec::new(),
                pages: known.as_ref().map(PageLinks::from),
                error: Some(format!("Page {requested} does not exist")),
            };
            return Ok((StatusCode::BAD_REQUEST, template).into_response());
        }
    };

    let template = match state
        .api()
        .list_products(page, state.config().page_size)
        .await
    {
        Ok(listing) => {
            session
                .insert(session_keys::PRODUCT_PAGINATION, listing.pagination)
                .await?;
            ProductsIndexTemplate {
                nav,
                products: listing.products.iter().map(ProductView::from).collect(),
                pages: Some(PageLinks::from(&listing.pagination)),
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, page, "Failed to load products");
            ProductsIndexTemplate {
                nav,
                products: Vec::new(),
                pages: known.as_ref().map(PageLinks::from),
                error: Some(e.user_message("Failed to load products")),
            }
        }
    };

    Ok(template.into_response())
}

/// Display product detail page.
#[instrument(skip(state, session, user), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<ProductId>,
    Query(query): Query<ErrorQuery>,
) -> Result<Response, AppError> {
    let nav = Nav::new(user.as_ref());

    match state.api().get_product(id).await {
        Ok(product) => Ok(ProductShowTemplate {
            nav,
            product: ProductView::from(&product),
            notice: current_notice(&session, id).await?,
            error: query.error,
        }
        .into_response()),
        Err(e) if e.is_not_found() => Ok((
            StatusCode::NOT_FOUND,
            ProductNotFoundTemplate {
                nav,
                message: "Product not found".to_string(),
            },
        )
            .into_response()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load product");
            Ok((
                StatusCode::BAD_GATEWAY,
                ProductNotFoundTemplate {
                    nav,
                    message: e.user_message("Failed to load product"),
                },
            )
                .into_response())
        }
    }
}

/// Add a product to the signed-in user's cart.
///
/// On success a notice is stored for the detail page; it clears itself
/// after the configured delay.
#[instrument(skip(state, session, user, form), fields(product_id = %id, user_id = %user.id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect, AppError> {
    let quantity = form.quantity();
    let detail_path = format!("/products/{id}");

    match state.api().add_to_cart(&user, id, quantity).await {
        Ok(message) => {
            let id_value = id.to_string();
            add_breadcrumb("cart", "Added to cart", &[("product_id", id_value.as_str())]);
            let notice = Notice::new(
                id,
                message.unwrap_or_else(|| "Added to cart".to_string()),
                state.config().notice_ttl,
                Utc::now(),
            );
            session.insert(session_keys::NOTICE, notice).await?;
            Ok(Redirect::to(&detail_path))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Add to cart failed");
            let message = e.user_message("Failed to add to cart");
            Ok(Redirect::to(&with_query(&detail_path, "error", &message)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(quantity: Option<&str>) -> AddToCartForm {
        AddToCartForm {
            quantity: quantity.map(String::from),
        }
    }

    #[test]
    fn test_quantity_is_raised_to_one() {
        assert_eq!(form(Some("0")).quantity(), 1);
        assert_eq!(form(Some("-5")).quantity(), 1);
        assert_eq!(form(None).quantity(), 1);
        assert_eq!(form(Some("abc")).quantity(), 1);
        assert_eq!(form(Some(" 4 ")).quantity(), 4);
    }

    #[test]
    fn test_page_query_parsing() {
        let query = |page: Option<&str>| PaginationQuery {
            page: page.map(String::from),
        };
        assert_eq!(query(None).page(), Ok(1));
        assert_eq!(query(Some("  ")).page(), Ok(1));
        assert_eq!(query(Some(" 3 ")).page(), Ok(3));
        assert_eq!(query(Some("-2")).page(), Ok(-2));
        assert_eq!(query(Some("abc")).page(), Err("abc"));
    }

    #[test]
    fn test_page_links_follow_metadata() {
        let links = PageLinks::from(&Pagination {
            current_page: 2,
            total_pages: 3,
            has_next: true,
            has_previous: true,
        });
        assert_eq!(links.previous, Some(1));
        assert_eq!(links.next, Some(3));
    }
}
