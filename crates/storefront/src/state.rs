//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::StorefrontConfig;
use crate::middleware::session::SESSION_IDLE_TIMEOUT;
use crate::services::{CartService, CartSyncRegistry};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the API client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    carts: CartSyncRegistry,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let api = ApiClient::new(&config.api);
        let carts = CartSyncRegistry::new(SESSION_IDLE_TIMEOUT);

        Self {
            inner: Arc::new(AppStateInner { config, api, carts }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the shop API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the per-user cart sequencing registry.
    #[must_use]
    pub fn carts(&self) -> &CartSyncRegistry {
        &self.inner.carts
    }

    /// Cart operations bound to this state.
    #[must_use]
    pub fn cart_service(&self) -> CartService<'_> {
        CartService::new(&self.inner.api, &self.inner.carts)
    }
}
