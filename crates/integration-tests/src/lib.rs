//! Integration test harness for the Bazaar storefront.
//!
//! [`TestShop::spawn`] starts two servers on ephemeral ports:
//!
//! - an in-process mock of the shop REST API ([`MockShop`]) that keeps its
//!   data in memory and records every request it receives
//! - the storefront router itself, pointed at the mock
//!
//! Tests drive the storefront with a cookie-holding `reqwest` client that
//! does not follow redirects, so redirect targets can be asserted.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::Utc;
use reqwest::redirect::Policy;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use bazaar_core::{
    Cart, CartItem, Email, Order, OrderId, OrderItem, Product, ProductId, ShippingAddress, User,
    UserId,
};
use bazaar_storefront::config::{ApiConfig, StorefrontConfig};
use bazaar_storefront::{AppState, app};

/// Password of every seeded account.
pub const SEED_PASSWORD: &str = "correct-horse";

// =============================================================================
// Request log
// =============================================================================

/// One request received by the mock shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub user_id: Option<String>,
}

impl RecordedRequest {
    /// Whether the request changes shop state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        self.method != Method::GET
    }
}

// =============================================================================
// Mock shop
// =============================================================================

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct ShopData {
    products: Vec<Product>,
    accounts: Vec<Account>,
    carts: HashMap<UserId, Vec<CartItem>>,
    orders: HashMap<UserId, Vec<Order>>,
    next_order_id: i64,
    requests: Vec<RecordedRequest>,
    cart_delays: VecDeque<Duration>,
    checkout_failure: Option<(StatusCode, Option<String>)>,
}

/// Handle to the in-memory shop backend.
#[derive(Clone)]
pub struct MockShop {
    data: Arc<Mutex<ShopData>>,
}

type Reply = (StatusCode, Json<Value>);

fn message(status: StatusCode, text: &str) -> Reply {
    (status, Json(json!({ "message": text })))
}

fn ok(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

fn identity(headers: &HeaderMap) -> Result<UserId, Reply> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "Authentication required"))
}

fn cart_json(items: &[CartItem]) -> Value {
    let total = Cart::new(items.to_vec())
        .total()
        .ok()
        .and_then(|total| total.to_string().parse::<f64>().ok());
    json!({
        "items": items,
        "total": total,
    })
}

impl MockShop {
    /// A shop seeded with `product_count` products and two accounts.
    ///
    /// Product `n` costs `n * 5` except product 1 (10.00) and product 2
    /// (5.00). Accounts: user 1 `alice@example.com`, user 2 `bob@example.com`.
    #[must_use]
    pub fn seeded(product_count: i64) -> Self {
        let products = (1..=product_count)
            .map(|n| Product {
                id: ProductId::new(n),
                name: format!("Product {n}"),
                description: format!("Description of product {n}"),
                price: match n {
                    1 => Decimal::from(10),
                    2 => Decimal::from(5),
                    _ => Decimal::from(n * 5),
                },
                image_url: None,
            })
            .collect();

        let accounts = [(1, "alice"), (2, "bob")]
            .into_iter()
            .map(|(id, name)| Account {
                user: User {
                    id: UserId::new(id),
                    username: name.to_string(),
                    email: Email::parse(&format!("{name}@example.com")).unwrap(),
                },
                password: SEED_PASSWORD.to_string(),
            })
            .collect();

        Self {
            data: Arc::new(Mutex::new(ShopData {
                products,
                accounts,
                next_order_id: 1,
                ..ShopData::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ShopData> {
        self.data.lock().unwrap()
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Number of requests received for `method` and `path`.
    #[must_use]
    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == *method && r.path == path)
            .count()
    }

    /// The user's cart lines as the shop currently stores them.
    #[must_use]
    pub fn cart(&self, user_id: i64) -> Vec<CartItem> {
        self.lock()
            .carts
            .get(&UserId::new(user_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Put a line straight into a user's cart.
    pub fn seed_cart_line(&self, user_id: i64, product_id: i64, quantity: i64) {
        let mut data = self.lock();
        let product = data
            .products
            .iter()
            .find(|p| p.id == ProductId::new(product_id))
            .cloned()
            .unwrap();
        data.carts
            .entry(UserId::new(user_id))
            .or_default()
            .push(CartItem {
                product_id: product.id,
                name: product.name,
                price: product.price,
                quantity,
            });
    }

    /// Delay the next `GET /cart` responses, in order. The cart is read
    /// before the delay, so a delayed response carries the state at arrival.
    pub fn delay_cart_fetches(&self, delays: impl IntoIterator<Item = Duration>) {
        self.lock().cart_delays.extend(delays);
    }

    /// Make the next checkout fail with `status` and an optional message.
    pub fn fail_next_checkout(&self, status: StatusCode, text: Option<&str>) {
        self.lock().checkout_failure = Some((status, text.map(String::from)));
    }

    /// The user record as the shop currently stores it.
    #[must_use]
    pub fn user(&self, user_id: i64) -> Option<User> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.user.id == UserId::new(user_id))
            .map(|a| a.user.clone())
    }

    /// Build the mock API router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/products", get(list_products))
            .route("/products/search", get(search_products))
            .route("/products/{id}", get(get_product))
            .route("/cart", get(get_cart))
            .route("/cart/add", post(add_to_cart))
            .route("/cart/update/{id}", put(update_cart_item))
            .route("/cart/remove/{id}", delete(remove_cart_item))
            .route("/profile", get(get_profile).put(update_profile))
            .route("/profile/change-password", post(change_password))
            .route("/checkout", post(checkout))
            .route("/orders", get(list_orders))
            .route("/login", post(login))
            .route("/register", post(register))
            .layer(middleware::from_fn_with_state(self.clone(), record_request))
            .with_state(self.clone())
    }
}

async fn record_request(State(shop): State<MockShop>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(String::from),
        user_id: request
            .headers()
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    };
    shop.lock().requests.push(recorded);
    next.run(request).await
}

// -----------------------------------------------------------------------------
// Catalog
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct PageParams {
    page: Option<usize>,
    per_page: Option<usize>,
}

async fn list_products(State(shop): State<MockShop>, Query(params): Query<PageParams>) -> Reply {
    let data = shop.lock();
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(8).max(1);
    let total_pages = data.products.len().div_ceil(per_page);
    let products: Vec<&Product> = data
        .products
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    ok(json!({
        "products": products,
        "current_page": page,
        "total_pages": total_pages,
        "has_next": page < total_pages,
        "has_prev": page > 1,
    }))
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

async fn search_products(State(shop): State<MockShop>, Query(params): Query<SearchParams>) -> Reply {
    let needle = params.q.to_lowercase();
    let data = shop.lock();
    let products: Vec<&Product> = data
        .products
        .iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle) || p.description.to_lowercase().contains(&needle)
        })
        .collect();
    ok(json!({ "products": products }))
}

async fn get_product(State(shop): State<MockShop>, Path(id): Path<i64>) -> Reply {
    shop.lock()
        .products
        .iter()
        .find(|p| p.id == ProductId::new(id))
        .map_or_else(
            || message(StatusCode::NOT_FOUND, "Product not found"),
            |product| ok(json!({ "product": product })),
        )
}

// -----------------------------------------------------------------------------
// Cart
// -----------------------------------------------------------------------------

async fn get_cart(State(shop): State<MockShop>, headers: HeaderMap) -> Reply {
    let user_id = match identity(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let (body, delay) = {
        let mut data = shop.lock();
        let items = data.carts.get(&user_id).cloned().unwrap_or_default();
        (cart_json(&items), data.cart_delays.pop_front())
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    ok(body)
}

#[derive(Deserialize)]
struct AddBody {
    product_id: i64,
    quantity: i64,
}

async fn add_to_cart(
    State(shop): State<MockShop>,
    headers: HeaderMap,
    Json(body): Json<AddBody>,
) -> Reply {
    let user_id = match identity(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let mut data = shop.lock();
    let Some(product) = data
        .products
        .iter()
        .find(|p| p.id == ProductId::new(body.product_id))
        .cloned()
    else {
        return message(StatusCode::NOT_FOUND, "Product not found");
    };

    let cart = data.carts.entry(user_id).or_default();
    if let Some(line) = cart.iter_mut().find(|l| l.product_id == product.id) {
        line.quantity = line.quantity.saturating_add(body.quantity);
    } else {
        cart.push(CartItem {
            product_id: product.id,
            name: product.name,
            price: product.price,
            quantity: body.quantity,
        });
    }
    message(StatusCode::OK, "Product added to cart")
}

#[derive(Deserialize)]
struct QuantityBody {
    quantity: i64,
}

/// A quantity of zero or below removes the line.
async fn update_cart_item(
    State(shop): State<MockShop>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<QuantityBody>,
) -> Reply {
    let user_id = match identity(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let mut data = shop.lock();
    let cart = data.carts.entry(user_id).or_default();
    let Some(index) = cart.iter().position(|l| l.product_id == ProductId::new(id)) else {
        return message(StatusCode::NOT_FOUND, "Item not in cart");
    };

    if body.quantity <= 0 {
        cart.remove(index);
    } else if let Some(line) = cart.get_mut(index) {
        line.quantity = body.quantity;
    }
    message(StatusCode::OK, "Cart updated")
}

async fn remove_cart_item(
    State(shop): State<MockShop>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply {
    let user_id = match identity(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let mut data = shop.lock();
    let cart = data.carts.entry(user_id).or_default();
    let before = cart.len();
    cart.retain(|l| l.product_id != ProductId::new(id));
    if cart.len() == before {
        return message(StatusCode::NOT_FOUND, "Item not in cart");
    }
    message(StatusCode::OK, "Item removed")
}

// -----------------------------------------------------------------------------
// Account
// -----------------------------------------------------------------------------

async fn get_profile(State(shop): State<MockShop>, headers: HeaderMap) -> Reply {
    let user_id = match identity(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    shop.lock()
        .accounts
        .iter()
        .find(|a| a.user.id == user_id)
        .map_or_else(
            || message(StatusCode::NOT_FOUND, "User not found"),
            |a| ok(json!({ "user": a.user })),
        )
}

#[derive(Deserialize)]
struct ProfileBody {
    username: String,
    email: String,
}

async fn update_profile(
    State(shop): State<MockShop>,
    headers: HeaderMap,
    Json(body): Json<ProfileBody>,
) -> Reply {
    let user_id = match identity(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let mut data = shop.lock();
    if data
        .accounts
        .iter()
        .any(|a| a.user.id != user_id && a.user.username == body.username)
    {
        return message(StatusCode::BAD_REQUEST, "Username already exists");
    }
    let Ok(email) = Email::parse(&body.email) else {
        return message(StatusCode::BAD_REQUEST, "Invalid email");
    };
    let Some(account) = data.accounts.iter_mut().find(|a| a.user.id == user_id) else {
        return message(StatusCode::NOT_FOUND, "User not found");
    };
    account.user.username = body.username;
    account.user.email = email;
    message(StatusCode::OK, "Profile updated successfully")
}

#[derive(Deserialize)]
struct PasswordBody {
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(shop): State<MockShop>,
    headers: HeaderMap,
    Json(body): Json<PasswordBody>,
) -> Reply {
    let user_id = match identity(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let mut data = shop.lock();
    let Some(account) = data.accounts.iter_mut().find(|a| a.user.id == user_id) else {
        return message(StatusCode::NOT_FOUND, "User not found");
    };
    if account.password != body.old_password {
        return message(StatusCode::BAD_REQUEST, "Invalid old password");
    }
    account.password = body.new_password;
    message(StatusCode::OK, "Password changed successfully")
}

async fn checkout(
    State(shop): State<MockShop>,
    headers: HeaderMap,
    Json(address): Json<ShippingAddress>,
) -> Reply {
    let user_id = match identity(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let mut data = shop.lock();
    if let Some((status, text)) = data.checkout_failure.take() {
        return match text {
            Some(text) => message(status, &text),
            None => (status, Json(json!({}))),
        };
    }
    if !address.missing_fields().is_empty() {
        return message(StatusCode::BAD_REQUEST, "Shipping address is incomplete");
    }

    let items = data.carts.remove(&user_id).unwrap_or_default();
    if items.is_empty() {
        return message(StatusCode::BAD_REQUEST, "Cart is empty");
    }

    let Ok(total_price) = Cart::new(items.clone()).total() else {
        data.carts.insert(user_id, items);
        return message(StatusCode::BAD_REQUEST, "Cart total is out of range");
    };

    let order = Order {
        id: OrderId::new(data.next_order_id),
        created_at: Utc::now(),
        total_price,
        items: items
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id,
                name: line.name.clone(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect(),
    };
    data.next_order_id += 1;
    data.orders.entry(user_id).or_default().push(order.clone());

    (StatusCode::CREATED, Json(json!({ "order": order })))
}

async fn list_orders(State(shop): State<MockShop>, headers: HeaderMap) -> Reply {
    let user_id = match identity(&headers) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let orders = shop.lock().orders.get(&user_id).cloned().unwrap_or_default();
    ok(json!({ "orders": orders }))
}

// -----------------------------------------------------------------------------
// Authentication
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(shop): State<MockShop>, Json(body): Json<LoginBody>) -> Reply {
    shop.lock()
        .accounts
        .iter()
        .find(|a| a.user.email.as_str() == body.email && a.password == body.password)
        .map_or_else(
            || message(StatusCode::UNAUTHORIZED, "Invalid credentials"),
            |a| ok(json!({ "message": "Login successful", "user": a.user })),
        )
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    email: String,
    password: String,
}

async fn register(State(shop): State<MockShop>, Json(body): Json<RegisterBody>) -> Reply {
    let mut data = shop.lock();
    if data.accounts.iter().any(|a| a.user.username == body.username) {
        return message(StatusCode::BAD_REQUEST, "Username already exists");
    }
    if data.accounts.iter().any(|a| a.user.email.as_str() == body.email) {
        return message(StatusCode::BAD_REQUEST, "Email already registered");
    }
    let Ok(email) = Email::parse(&body.email) else {
        return message(StatusCode::BAD_REQUEST, "Invalid email");
    };

    let id = i64::try_from(data.accounts.len()).unwrap() + 1;
    data.accounts.push(Account {
        user: User {
            id: UserId::new(id),
            username: body.username,
            email,
        },
        password: body.password,
    });
    message(StatusCode::CREATED, "User registered successfully")
}

// =============================================================================
// Harness
// =============================================================================

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A running storefront wired to a mock shop.
pub struct TestShop {
    pub shop: MockShop,
    pub client: reqwest::Client,
    base_url: String,
}

impl TestShop {
    /// Start with five products, a page size of 2 and the default notice delay.
    pub async fn spawn() -> Self {
        Self::spawn_with(MockShop::seeded(5), |_| {}).await
    }

    /// Start against `shop`, adjusting the storefront config first.
    pub async fn spawn_with(shop: MockShop, configure: impl FnOnce(&mut StorefrontConfig)) -> Self {
        let api_addr = serve(shop.router()).await;

        let mut config = StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            api: ApiConfig::new(&format!("http://{api_addr}")).unwrap(),
            page_size: 2,
            notice_ttl: Duration::from_secs(3),
            sentry_dsn: None,
            sentry_environment: None,
        };
        configure(&mut config);

        let storefront_addr = serve(app(AppState::new(config))).await;

        Self {
            shop,
            client: new_client(),
            base_url: format!("http://{storefront_addr}"),
        }
    }

    /// Absolute storefront URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Log in as a seeded account by name (`alice` or `bob`).
    pub async fn login_as(&self, name: &str) {
        let email = format!("{name}@example.com");
        let response = self
            .post_form(
                "/auth/login",
                &[("email", email.as_str()), ("password", SEED_PASSWORD)],
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    }
}

/// Cookie-holding client that leaves redirects to the test.
#[must_use]
pub fn new_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

/// The `Location` header of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
