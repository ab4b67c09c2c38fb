//! Product listing, detail and search through the storefront.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use bazaar_integration_tests::TestShop;
use reqwest::StatusCode;

#[tokio::test]
async fn test_every_page_in_range_matches_its_metadata() {
    let shop = TestShop::spawn().await;

    for page in 1..=3 {
        let response = shop.get(&format!("/products?page={page}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.text().await.unwrap();
        assert!(body.contains(&format!("Page {page} of 3")), "page {page}: {body}");
    }

    let queries: Vec<_> = shop
        .shop
        .requests()
        .into_iter()
        .filter_map(|r| r.query)
        .collect();
    assert_eq!(
        queries,
        vec![
            "page=1&per_page=2".to_string(),
            "page=2&per_page=2".to_string(),
            "page=3&per_page=2".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_listing_shows_products_and_neighbour_links() {
    let shop = TestShop::spawn().await;

    let body = shop.get("/products?page=2").await.text().await.unwrap();
    assert!(body.contains("Product 3"));
    assert!(body.contains("Product 4"));
    assert!(!body.contains("Product 5"));
    assert!(body.contains(r#"href="/products?page=1""#));
    assert!(body.contains(r#"href="/products?page=3""#));
}

#[tokio::test]
async fn test_out_of_range_page_is_rejected_without_fetch() {
    let shop = TestShop::spawn().await;
    assert_eq!(shop.get("/products").await.status(), StatusCode::OK);
    shop.shop.clear_requests();

    let response = shop.get("/products?page=4").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("Page 4 does not exist"));

    let response = shop.get("/products?page=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(shop.shop.requests().is_empty());
}

#[tokio::test]
async fn test_page_below_one_rejected_before_bounds_are_known() {
    let shop = TestShop::spawn().await;

    let response = shop.get("/products?page=-1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(shop.shop.count(&Method::GET, "/products"), 0);
}

#[tokio::test]
async fn test_malformed_page_renders_listing_error() {
    let shop = TestShop::spawn().await;

    let response = shop.get("/products?page=abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("Page abc does not exist"));
    assert!(body.contains("<html"));
    assert_eq!(shop.shop.count(&Method::GET, "/products"), 0);

    // An empty value falls back to the first page.
    let response = shop.get("/products?page=").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_home_redirects_to_listing() {
    let shop = TestShop::spawn().await;
    let response = shop.get("/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        bazaar_integration_tests::location(&response).as_deref(),
        Some("/products")
    );
}

#[tokio::test]
async fn test_product_detail() {
    let shop = TestShop::spawn().await;

    let response = shop.get("/products/1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Product 1"));
    assert!(body.contains("$10.00"));
    assert!(body.contains(r#"action="/products/1/add-to-cart""#));
}

#[tokio::test]
async fn test_missing_product_renders_not_found() {
    let shop = TestShop::spawn().await;

    let response = shop.get("/products/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("Product not found"));

    // The storefront keeps serving afterwards.
    assert_eq!(shop.get("/products/2").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_blank_search_issues_no_fetch() {
    let shop = TestShop::spawn().await;

    let response = shop.get("/search?q=%20%20").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.text().await.unwrap().contains("No products found."));
    assert!(shop.shop.requests().is_empty());
}

#[tokio::test]
async fn test_search_results() {
    let shop = TestShop::spawn().await;

    let body = shop.get("/search?q=product%203").await.text().await.unwrap();
    assert!(body.contains("Product 3"));
    assert!(!body.contains("Product 4"));

    let recorded = shop.shop.requests();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].path, "/products/search");
    assert_eq!(recorded[0].query.as_deref(), Some("q=product+3"));

    let body = shop.get("/search?q=zzz").await.text().await.unwrap();
    assert!(body.contains("No products found."));
}

#[tokio::test]
async fn test_health_endpoints() {
    let shop = TestShop::spawn().await;

    assert_eq!(shop.get("/health").await.status(), StatusCode::OK);
    assert_eq!(shop.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let shop = TestShop::spawn().await;

    let response = shop
        .client
        .get(shop.url("/health"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "abc-123"
    );

    let generated = shop.get("/health").await;
    assert!(generated.headers().contains_key("x-request-id"));
}
