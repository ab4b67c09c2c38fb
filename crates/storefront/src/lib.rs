//! Bazaar storefront library.
//!
//! Server-rendered shop front over the Bazaar REST API. Exposed as a library
//! so the router can be driven from integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
