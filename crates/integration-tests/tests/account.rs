//! Login, registration, checkout, orders and profile through the storefront.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use bazaar_integration_tests::{SEED_PASSWORD, TestShop, location};
use reqwest::StatusCode;

const ADDRESS: [(&str, &str); 4] = [
    ("shipping_address", "1 Main St"),
    ("shipping_city", "Springfield"),
    ("shipping_postal_code", "12345"),
    ("shipping_country", "US"),
];

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_login_switches_navigation() {
    let shop = TestShop::spawn().await;

    let body = shop.get("/products").await.text().await.unwrap();
    assert!(body.contains(r#"href="/auth/login""#));
    assert!(!body.contains("Logout"));

    shop.login_as("alice").await;

    let body = shop.get("/products").await.text().await.unwrap();
    assert!(body.contains("alice"));
    assert!(body.contains("Logout"));
    assert!(body.contains(r#"href="/orders""#));
}

#[tokio::test]
async fn test_bad_credentials_show_server_message() {
    let shop = TestShop::spawn().await;

    let response = shop
        .post_form(
            "/auth/login",
            &[("email", "alice@example.com"), ("password", "nope")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.text().await.unwrap().contains("Invalid credentials"));

    let response = shop.get("/cart").await;
    assert_eq!(location(&response).as_deref(), Some("/auth/login"));
}

#[tokio::test]
async fn test_malformed_email_is_not_submitted() {
    let shop = TestShop::spawn().await;

    let response = shop
        .post_form(
            "/auth/login",
            &[("email", "not-an-email"), ("password", SEED_PASSWORD)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.text().await.unwrap().contains("Invalid email"));
    assert_eq!(shop.shop.count(&Method::POST, "/login"), 0);
}

#[tokio::test]
async fn test_register_then_login() {
    let shop = TestShop::spawn().await;

    let response = shop
        .post_form(
            "/auth/register",
            &[
                ("username", "carol"),
                ("email", "carol@example.com"),
                ("password", "pa55word!"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response).unwrap();
    assert!(target.starts_with("/auth/login?success="));

    let body = shop.get(&target).await.text().await.unwrap();
    assert!(body.contains("Registration successful. Please log in."));

    let response = shop
        .post_form(
            "/auth/login",
            &[("email", "carol@example.com"), ("password", "pa55word!")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(shop.get("/products").await.text().await.unwrap().contains("carol"));
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let shop = TestShop::spawn().await;

    let response = shop
        .post_form(
            "/auth/register",
            &[
                ("username", "alice"),
                ("email", "other@example.com"),
                ("password", "pa55word!"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("Username already exists"));
}

#[tokio::test]
async fn test_logout_clears_identity() {
    let shop = TestShop::spawn().await;
    shop.login_as("alice").await;
    assert_eq!(shop.get("/cart").await.status(), StatusCode::OK);

    let response = shop.post_form("/auth/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/products"));

    shop.shop.clear_requests();
    let response = shop.get("/cart").await;
    assert_eq!(location(&response).as_deref(), Some("/auth/login"));
    assert!(shop.shop.requests().is_empty());
}

// ============================================================================
// Checkout & Orders
// ============================================================================

#[tokio::test]
async fn test_checkout_places_order_and_lists_it() {
    let shop = TestShop::spawn().await;
    shop.shop.seed_cart_line(1, 1, 2);
    shop.shop.seed_cart_line(1, 2, 1);
    shop.login_as("alice").await;

    let body = shop.get("/orders").await.text().await.unwrap();
    assert!(body.contains("You have no orders."));

    let body = shop.get("/checkout").await.text().await.unwrap();
    assert!(body.contains("$25.00"));

    let response = shop.post_form("/checkout", &ADDRESS).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/orders"));

    let body = shop.get("/orders").await.text().await.unwrap();
    assert!(body.contains("Order #1"));
    assert!(body.contains("$25.00"));
    assert!(body.contains("Product 1"));
    assert!(shop.shop.cart(1).is_empty());
}

#[tokio::test]
async fn test_checkout_requires_every_field() {
    let shop = TestShop::spawn().await;
    shop.shop.seed_cart_line(1, 1, 1);
    shop.login_as("alice").await;

    let response = shop
        .post_form(
            "/checkout",
            &[
                ("shipping_address", "1 Main St"),
                ("shipping_city", "  "),
                ("shipping_postal_code", "12345"),
                ("shipping_country", "US"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Please fill in: City"));
    assert!(body.contains(r#"value="1 Main St""#));
    assert_eq!(shop.shop.count(&Method::POST, "/checkout"), 0);
}

#[tokio::test]
async fn test_checkout_failure_messages() {
    let shop = TestShop::spawn().await;
    shop.login_as("alice").await;

    let response = shop.post_form("/checkout", &ADDRESS).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("Cart is empty"));

    shop.shop.seed_cart_line(1, 1, 1);
    shop.shop
        .fail_next_checkout(StatusCode::INTERNAL_SERVER_ERROR, Some("Payment declined"));
    let response = shop.post_form("/checkout", &ADDRESS).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(response.text().await.unwrap().contains("Payment declined"));

    shop.shop.fail_next_checkout(StatusCode::BAD_GATEWAY, None);
    let response = shop.post_form("/checkout", &ADDRESS).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(response.text().await.unwrap().contains("Checkout failed"));
}

// ============================================================================
// Profile
// ============================================================================

#[tokio::test]
async fn test_profile_shows_backend_values() {
    let shop = TestShop::spawn().await;
    shop.login_as("alice").await;

    let body = shop.get("/profile").await.text().await.unwrap();
    assert!(body.contains(r#"value="alice""#));
    assert!(body.contains(r#"value="alice@example.com""#));
}

#[tokio::test]
async fn test_profile_update_reports_only_its_own_result() {
    let shop = TestShop::spawn().await;
    shop.login_as("alice").await;

    let body = shop
        .post_form(
            "/profile",
            &[("username", "alicia"), ("email", "alicia@example.com")],
        )
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Profile updated successfully"));
    assert!(!body.contains("Password changed"));
    assert!(body.contains(r#"value="alicia""#));
    assert_eq!(shop.shop.user(1).unwrap().username, "alicia");

    // Navigation picks up the new name.
    let body = shop.get("/products").await.text().await.unwrap();
    assert!(body.contains("alicia"));
}

#[tokio::test]
async fn test_profile_update_conflict() {
    let shop = TestShop::spawn().await;
    shop.login_as("alice").await;

    let response = shop
        .post_form(
            "/profile",
            &[("username", "bob"), ("email", "alice@example.com")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("Username already exists"));
    assert_eq!(shop.shop.user(1).unwrap().username, "alice");
}

#[tokio::test]
async fn test_profile_update_rejects_malformed_email() {
    let shop = TestShop::spawn().await;
    shop.login_as("alice").await;

    let response = shop
        .post_form("/profile", &[("username", "alice"), ("email", "not-an-email")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("Invalid email"));
    assert_eq!(shop.shop.count(&Method::PUT, "/profile"), 0);
}

#[tokio::test]
async fn test_password_change_reports_only_its_own_result() {
    let shop = TestShop::spawn().await;
    shop.login_as("alice").await;

    let response = shop
        .post_form(
            "/profile/password",
            &[("old_password", "wrong"), ("new_password", "n3w-pass")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Invalid old password"));
    assert!(!body.contains("Profile updated"));

    let body = shop
        .post_form(
            "/profile/password",
            &[("old_password", SEED_PASSWORD), ("new_password", "n3w-pass")],
        )
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Password changed successfully"));
}
