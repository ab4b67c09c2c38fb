//! Bazaar storefront - customer-facing shop site.
//!
//! Renders catalog, cart, checkout and account pages on the server and talks
//! to the Bazaar REST API for all data. There is no local database; the only
//! state held here is the in-memory session store and cart ordering.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;

use bazaar_storefront::{AppState, app, config::StorefrontConfig};
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "bazaar_storefront=info,tower_http=debug";

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Sentry must be up before the subscriber so its layer has a client.
    let _sentry = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: config.sentry_environment.clone().map(Cow::Owned),
                attach_stacktrace: true,
                ..Default::default()
            },
        ))
    });

    init_tracing();
    if config.sentry_dsn.is_some() {
        tracing::info!("Sentry initialized");
    }

    let addr = config.socket_addr();
    tracing::info!(api = %config.api.base_url, page_size = config.page_size, "Configuration loaded");

    let router = app(AppState::new(config))
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!("storefront listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Console logging filtered by `RUST_LOG`, with warnings and errors
/// forwarded to Sentry as events and lower levels kept as breadcrumbs.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let sentry_layer = sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate()).expect("Failed to install signal handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.expect("Failed to install Ctrl+C handler"),
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");

    tracing::info!("Shutdown signal received, draining connections");
}
