//! Shop REST API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth - NO local persistence, direct API calls
//! - No response caching: every view fetch goes to the backend
//! - No retries or client-side timeouts; a failed call is final for that view
//!
//! # Identity
//!
//! Every authenticated call takes the session's [`CurrentUser`] and sends its
//! id in the [`USER_ID_HEADER`]. There is no other way to identify the caller,
//! so an unauthenticated view cannot issue an authenticated request.
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api);
//!
//! let page = client.list_products(1, 8).await?;
//! let cart = client.get_cart(&current_user).await?;
//! ```

pub mod types;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use bazaar_core::{Cart, Order, Product, ProductId, ShippingAddress, User};

use crate::config::ApiConfig;
use crate::models::CurrentUser;

use types::{
    AddToCartRequest, LoginRequest, LoginResponse, MessageBody, OrderEnvelope, OrderList,
    PasswordChange, ProductEnvelope, ProductList, ProductPage, ProfileUpdate, RegisterRequest,
    UpdateQuantityRequest, UserEnvelope,
};

/// Header carrying the caller's user id on authenticated calls.
pub const USER_ID_HEADER: &str = "x-user-id";

/// How much of an unexpected response body to keep in logs.
const LOGGED_BODY_CHARS: usize = 500;

/// Errors that can occur when calling the shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, reset, bad TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend requires (different) authentication.
    #[error("Authentication required")]
    Unauthorized(Option<String>),

    /// The requested resource does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        message: Option<String>,
    },

    /// The backend rejected the request and said why.
    #[error("Rejected: {0}")]
    Validation(String),

    /// Any other non-success status.
    #[error("Unexpected status {status}")]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// The response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// The message the backend put in the response body, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Validation(message) => Some(message),
            Self::Unauthorized(message)
            | Self::NotFound { message, .. }
            | Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// A single user-visible string for this failure.
    ///
    /// A backend-provided message wins over the view's `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Status for a form page re-rendered after the backend refused it.
    ///
    /// Any 4xx answer rejects the submission (422). Transport failures,
    /// 5xx answers and unreadable bodies are upstream failures (502).
    #[must_use]
    pub fn rejection_status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Unauthorized(_) | Self::NotFound { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Status { status, .. }
                if StatusCode::from_u16(*status).is_ok_and(|s| s.is_client_error()) =>
            {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Map a non-success response to an error.
    fn from_response(status: StatusCode, body: &str, resource: &str) -> Self {
        let message = serde_json::from_str::<MessageBody>(body)
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.trim().is_empty());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message),
            StatusCode::NOT_FOUND => Self::NotFound {
                resource: resource.to_string(),
                message,
            },
            s if s.is_client_error() && message.is_some() => {
                Self::Validation(message.unwrap_or_default())
            }
            s => Self::Status {
                status: s.as_u16(),
                message,
            },
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the shop REST API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl ApiClient {
    /// Create a new API client.
    #[must_use]
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                token: config.token.clone(),
            }),
        }
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Start a request, attaching the identity header when acting for a user.
    fn request(&self, method: Method, url: Url, identity: Option<&CurrentUser>) -> RequestBuilder {
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(token) = &self.inner.token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(user) = identity {
            builder = builder.header(USER_ID_HEADER, user.id.to_string());
        }
        builder
    }

    /// Send a request and decode a JSON response body.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<T, ApiError> {
        let body = self.send_raw(builder, resource).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                resource,
                body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                "Failed to parse shop API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose success body is at most an acknowledgement.
    async fn send_ack(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<Option<String>, ApiError> {
        let body = self.send_raw(builder, resource).await?;
        Ok(serde_json::from_str::<MessageBody>(&body)
            .ok()
            .and_then(|ack| ack.message))
    }

    async fn send_raw(&self, builder: RequestBuilder, resource: &str) -> Result<String, ApiError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, resource, "Shop API request failed");
            ApiError::Http(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let error = ApiError::from_response(status, &body, resource);
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                resource,
                body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                "Shop API returned server error"
            );
        } else {
            tracing::debug!(status = %status, resource, error = %error, "Shop API rejected request");
        }
        Err(error)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch one page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn list_products(&self, page: u32, per_page: u32) -> Result<ProductPage, ApiError> {
        let mut url = self.endpoint("products")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());

        self.send(self.request(Method::GET, url, None), "products")
            .await
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let resource = format!("product {id}");
        let url = self.endpoint(&format!("products/{id}"))?;
        let envelope: ProductEnvelope = self
            .send(self.request(Method::GET, url, None), &resource)
            .await?;
        Ok(envelope.product)
    }

    /// Free-text product search.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        let mut url = self.endpoint("products/search")?;
        url.query_pairs_mut().append_pair("q", query);

        let list: ProductList = self
            .send(self.request(Method::GET, url, None), "product search")
            .await?;
        Ok(list.products)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn get_cart(&self, user: &CurrentUser) -> Result<Cart, ApiError> {
        let url = self.endpoint("cart")?;
        self.send(self.request(Method::GET, url, Some(user)), "cart")
            .await
    }

    /// Add a product to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn add_to_cart(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint("cart/add")?;
        let body = AddToCartRequest {
            product_id,
            quantity,
        };
        self.send_ack(self.request(Method::POST, url, Some(user)).json(&body), "cart")
            .await
    }

    /// Set the quantity of one cart line. The quantity is sent unchanged,
    /// even when it is below 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn update_cart_item(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&format!("cart/update/{product_id}"))?;
        let body = UpdateQuantityRequest { quantity };
        self.send_ack(
            self.request(Method::PUT, url, Some(user)).json(&body),
            "cart item",
        )
        .await
    }

    /// Remove one line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn remove_cart_item(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&format!("cart/remove/{product_id}"))?;
        self.send_ack(self.request(Method::DELETE, url, Some(user)), "cart item")
            .await
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Fetch the user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn get_profile(&self, user: &CurrentUser) -> Result<User, ApiError> {
        let url = self.endpoint("profile")?;
        let envelope: UserEnvelope = self
            .send(self.request(Method::GET, url, Some(user)), "profile")
            .await?;
        Ok(envelope.user)
    }

    /// Update username and email.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, user, update), fields(user_id = %user.id))]
    pub async fn update_profile(
        &self,
        user: &CurrentUser,
        update: &ProfileUpdate,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint("profile")?;
        self.send_ack(
            self.request(Method::PUT, url, Some(user)).json(update),
            "profile",
        )
        .await
    }

    /// Change the user's password.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change (e.g., wrong old
    /// password).
    #[instrument(skip(self, user, change), fields(user_id = %user.id))]
    pub async fn change_password(
        &self,
        user: &CurrentUser,
        change: &PasswordChange,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint("profile/change-password")?;
        self.send_ack(
            self.request(Method::POST, url, Some(user)).json(change),
            "password",
        )
        .await
    }

    /// Place an order for the current cart contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the checkout.
    #[instrument(skip(self, user, address), fields(user_id = %user.id))]
    pub async fn checkout(
        &self,
        user: &CurrentUser,
        address: &ShippingAddress,
    ) -> Result<Order, ApiError> {
        let url = self.endpoint("checkout")?;
        let envelope: OrderEnvelope = self
            .send(
                self.request(Method::POST, url, Some(user)).json(address),
                "checkout",
            )
            .await?;
        Ok(envelope.order)
    }

    /// Fetch the user's order history.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn list_orders(&self, user: &CurrentUser) -> Result<Vec<Order>, ApiError> {
        let url = self.endpoint("orders")?;
        let list: OrderList = self
            .send(self.request(Method::GET, url, Some(user)), "orders")
            .await?;
        Ok(list.orders)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange credentials for the user's identity.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for bad credentials.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: &LoginRequest) -> Result<User, ApiError> {
        let url = self.endpoint("login")?;
        let response: LoginResponse = self
            .send(self.request(Method::POST, url, None).json(request), "login")
            .await?;
        Ok(response.user)
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] if the backend refuses (e.g., the
    /// username or email is taken).
    #[instrument(skip(self, request))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<String>, ApiError> {
        let url = self.endpoint("register")?;
        self.send_ack(
            self.request(Method::POST, url, None).json(request),
            "registration",
        )
        .await
    }

    /// Check that the backend answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.list_products(1, 1).await.map(|_| ())
    }
}
