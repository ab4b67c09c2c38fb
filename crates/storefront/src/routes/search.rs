//! Product search route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use super::Nav;
use super::products::ProductView;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Search results page template.
#[derive(Template, WebTemplate)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub nav: Nav,
    pub query: String,
    pub searched: bool,
    pub products: Vec<ProductView>,
    pub error: Option<String>,
}

/// Display search results. A blank query renders an empty page without a fetch.
#[instrument(skip(state, user))]
pub async fn search(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let nav = Nav::new(user.as_ref());
    let query = query.q.unwrap_or_default().trim().to_string();

    if query.is_empty() {
        return SearchTemplate {
            nav,
            query,
            searched: false,
            products: Vec::new(),
            error: None,
        };
    }

    match state.api().search_products(&query).await {
        Ok(products) => SearchTemplate {
            nav,
            query,
            searched: true,
            products: products.iter().map(ProductView::from).collect(),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Search failed");
            SearchTemplate {
                nav,
                query,
                searched: true,
                products: Vec::new(),
                error: Some(e.user_message("Search failed")),
            }
        }
    }
}
