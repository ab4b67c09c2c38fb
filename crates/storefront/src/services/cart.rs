//! Cart synchronization.
//!
//! The backend owns the cart. Every mutation is followed by a full re-fetch;
//! nothing is patched locally. Fetches for the same user are ordered with a
//! [`SnapshotSequencer`]: each fetch takes a token before it is sent, and a
//! response that comes back after a newer one has been applied is replaced
//! by that newer snapshot. Two racing mutations therefore always render the
//! state of the most recently issued fetch.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::sync::Cache;
use tracing::instrument;

use bazaar_core::{ApplyOutcome, Cart, ProductId, SnapshotSequencer, UserId};

use crate::api::{ApiClient, ApiError};
use crate::models::CurrentUser;

/// Upper bound on users with live sequencing state.
const MAX_TRACKED_USERS: u64 = 10_000;

type SharedSequencer = Arc<Mutex<SnapshotSequencer<Cart>>>;

/// Per-user cart sequencing state, evicted after inactivity.
#[derive(Clone)]
pub struct CartSyncRegistry {
    sequencers: Cache<UserId, SharedSequencer>,
}

impl CartSyncRegistry {
    /// Create a registry that forgets users idle for `idle_timeout`.
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sequencers: Cache::builder()
                .max_capacity(MAX_TRACKED_USERS)
                .time_to_idle(idle_timeout)
                .build(),
        }
    }

    fn sequencer(&self, user_id: UserId) -> SharedSequencer {
        self.sequencers.get_with(user_id, SharedSequencer::default)
    }

    /// The newest cart snapshot applied for a user, if any.
    #[must_use]
    pub fn latest(&self, user_id: UserId) -> Option<Cart> {
        self.sequencers.get(&user_id).and_then(|sequencer| {
            sequencer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .latest()
                .cloned()
        })
    }

    /// Drop a user's state (on logout).
    pub fn forget(&self, user_id: UserId) {
        self.sequencers.invalidate(&user_id);
    }
}

/// Cart operations for one request.
pub struct CartService<'a> {
    api: &'a ApiClient,
    registry: &'a CartSyncRegistry,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient, registry: &'a CartSyncRegistry) -> Self {
        Self { api, registry }
    }

    /// Fetch the user's cart, ordered against concurrent fetches.
    ///
    /// # Errors
    ///
    /// Returns the API error if the fetch fails; no retry is attempted.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn fetch(&self, user: &CurrentUser) -> Result<Cart, ApiError> {
        let sequencer = self.registry.sequencer(user.id);
        let token = sequencer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .issue();

        let cart = self.api.get_cart(user).await?;

        let resolved = sequencer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(token, cart);

        if resolved.outcome == ApplyOutcome::Discarded {
            tracing::debug!(
                token = token.value(),
                "Discarded stale cart response in favour of a newer snapshot"
            );
        }

        Ok(resolved.snapshot)
    }

    /// Send a new quantity for one line, then re-fetch the whole cart.
    ///
    /// # Errors
    ///
    /// Returns the API error from the update or the re-fetch.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn update_quantity(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, ApiError> {
        self.api
            .update_cart_item(user, product_id, quantity)
            .await?;
        self.fetch(user).await
    }

    /// Remove one line, then re-fetch the whole cart.
    ///
    /// # Errors
    ///
    /// Returns the API error from the removal or the re-fetch.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn remove(&self, user: &CurrentUser, product_id: ProductId) -> Result<Cart, ApiError> {
        self.api.remove_cart_item(user, product_id).await?;
        self.fetch(user).await
    }
}
