//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added in `main`, capture errors)
//! 2. `TraceLayer` (request span with a `request_id` field)
//! 3. Request ID (fill the span field, echo the header)
//! 4. Session layer (tower-sessions with in-memory store)

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{AuthContext, OptionalAuth, RequireAuth};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
