//! End-to-end tests driving the router against the in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use trady_server::app_state::AppState;
use trady_server::config::AppConfig;
use trady_server::create_router;
use trady_server::middleware::{JwtKeys, Role};
use trady_server::models::{BargainStatus, Product, Storefront};
use trady_server::store::{Database, MemoryDatabase, Tx};

const SECRET: &str = "integration-secret";
const BUYER_PHONE: &str = "08012345678";

struct TestApp {
    router: Router,
    db: MemoryDatabase,
    keys: JwtKeys,
}

impl TestApp {
    fn new() -> Self {
        let db = MemoryDatabase::new();
        let config = AppConfig {
            jwt_secret: SECRET.to_string(),
            ..AppConfig::default()
        };
        let state = AppState::new(Arc::new(db.clone()), &config);
        Self {
            router: create_router(state, None),
            db,
            keys: JwtKeys::new(SECRET, 7),
        }
    }

    fn token(&self, sub: &str, role: Role) -> String {
        self.keys.issue(sub, role, Duration::hours(1)).unwrap()
    }

    fn seller_token(&self, seller_id: Uuid) -> String {
        self.token(&seller_id.to_string(), Role::Seller)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&body).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn seed_seller(&self, name: &str, price: f64, stock: u32) -> (Uuid, Product) {
        let seller_id = Uuid::new_v4();
        self.db
            .seed_storefront(Storefront::new(seller_id, format!("{name} Store"), "Lagos"))
            .await;
        let product = Product::new(seller_id, name, price, stock).bargainable();
        self.db.seed_product(product.clone()).await;
        (seller_id, product)
    }

    async fn stock_of(&self, product_id: Uuid) -> u32 {
        let mut tx = self.db.begin().await.unwrap();
        tx.product(product_id).await.unwrap().unwrap().stock
    }
}

fn items(product_id: Uuid, quantity: i64) -> Value {
    json!([{ "productId": product_id, "quantity": quantity }])
}

async fn start_bargain(app: &TestApp, product_id: Uuid, quantity: i64, total: f64) -> Uuid {
    let (status, body) = app
        .send(
            Method::POST,
            "/api/bargain/start",
            None,
            Some(json!({
                "buyerName": "Ada",
                "buyerPhone": "+2348012345678",
                "items": items(product_id, quantity),
                "totalOfferedPrice": total,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    serde_json::from_value(body["data"]["id"].clone()).unwrap()
}

#[tokio::test]
async fn health_and_banner_respond() {
    let app = TestApp::new();
    let (status, _) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn listing_routes_answer_on_an_empty_store() {
    let app = TestApp::new();
    let seller = app.seller_token(Uuid::new_v4());

    for (uri, token) in [
        ("/api/groupbuys/public".to_string(), None),
        ("/api/groupbuys/seller".to_string(), Some(seller.as_str())),
        (format!("/api/groupbuys/successful/{BUYER_PHONE}"), None),
        (format!("/api/bargain/successful/{BUYER_PHONE}"), None),
        (format!("/api/bargain/buyer?buyerPhone={BUYER_PHONE}"), None),
    ] {
        let (status, body) = app.send(Method::GET, &uri, token, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert!(body["data"].as_array().unwrap().is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn negotiated_bargain_flows_through_cart_into_order() {
    let app = TestApp::new();
    let (seller_id, product) = app.seed_seller("Ankara fabric", 1000.0, 5).await;
    let seller = app.seller_token(seller_id);

    let bargain_id = start_bargain(&app, product.id, 3, 2500.0).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/bargain/respond",
            Some(&seller),
            Some(json!({
                "bargainId": bargain_id,
                "action": "counter",
                "items": items(product.id, 3),
                "totalCounterPrice": 2800.0,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/bargain/buyer/respond",
            None,
            Some(json!({
                "bargainId": bargain_id,
                "action": "accept",
                "buyerPhone": BUYER_PHONE,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "accepted");
    assert_eq!(body["data"]["acceptedPrice"], 2800.0);

    let cart_uri = format!("/api/bargain/{bargain_id}/add-to-cart");
    let (status, body) = app
        .send(
            Method::POST,
            &cart_uri,
            None,
            Some(json!({ "buyerPhone": BUYER_PHONE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let lines = body["data"]["items"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 3);
    assert!((lines[0]["price"].as_f64().unwrap() - 2800.0 / 3.0).abs() < 1e-6);
    assert_eq!(lines[0]["isBargain"], true);

    let (status, body) = app
        .send(
            Method::POST,
            &cart_uri,
            None,
            Some(json!({ "buyerPhone": BUYER_PHONE })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Bargain already added to cart");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/orders/place",
            None,
            Some(json!({
                "buyerName": "Ada",
                "buyerPhone": BUYER_PHONE,
                "location": "Ikeja",
                "products": [],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"]["orderId"].as_str().unwrap().starts_with("TRADY-"));
    assert!(!body["data"]["token"].as_str().unwrap().is_empty());
    assert_eq!(body["data"]["order"]["products"][0]["isBargain"], true);

    assert_eq!(app.stock_of(product.id).await, 2);
    let mut tx = app.db.begin().await.unwrap();
    let bargain = tx.bargain(bargain_id).await.unwrap().unwrap();
    assert_eq!(bargain.status, BargainStatus::Completed);
    assert!(tx.cart(BUYER_PHONE).await.unwrap().is_none());
}

#[tokio::test]
async fn buyer_accept_without_counter_prices_from_opening_offer() {
    let app = TestApp::new();
    let (_, product) = app.seed_seller("Ankara fabric", 1000.0, 5).await;
    let bargain_id = start_bargain(&app, product.id, 3, 2400.0).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/bargain/buyer/respond",
            None,
            Some(json!({
                "bargainId": bargain_id,
                "action": "accept",
                "buyerPhone": BUYER_PHONE,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "accepted");
    assert!(body["data"]["acceptedPrice"].is_null());

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/bargain/{bargain_id}/add-to-cart"),
            None,
            Some(json!({ "buyerPhone": BUYER_PHONE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["items"][0]["price"], 800.0);
}

#[tokio::test]
async fn expired_bargain_is_stored_as_expired_on_respond() {
    let app = TestApp::new();
    let (seller_id, product) = app.seed_seller("Ankara fabric", 1000.0, 5).await;
    let bargain_id = start_bargain(&app, product.id, 3, 2500.0).await;

    let mut tx = app.db.begin().await.unwrap();
    let mut bargain = tx.bargain(bargain_id).await.unwrap().unwrap();
    bargain.created_at = Utc::now() - Duration::days(8);
    tx.save_bargain(&bargain).await.unwrap();
    tx.commit().await.unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/bargain/respond",
            Some(&app.seller_token(seller_id)),
            Some(json!({ "bargainId": bargain_id, "action": "accept" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Bargain has expired");

    let mut tx = app.db.begin().await.unwrap();
    let stored = tx.bargain(bargain_id).await.unwrap().unwrap();
    assert_eq!(stored.status, BargainStatus::Expired);
    assert_eq!(stored.accepted_price, None);
}

#[tokio::test]
async fn concurrent_placements_consume_a_reserved_bargain_once() {
    let app = TestApp::new();
    let (seller_id, product) = app.seed_seller("Ankara fabric", 1000.0, 5).await;
    let bargain_id = start_bargain(&app, product.id, 2, 1800.0).await;
    app.send(
        Method::POST,
        "/api/bargain/respond",
        Some(&app.seller_token(seller_id)),
        Some(json!({ "bargainId": bargain_id, "action": "accept" })),
    )
    .await;
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/bargain/{bargain_id}/add-to-cart"),
            None,
            Some(json!({ "buyerPhone": BUYER_PHONE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let order = json!({
        "buyerName": "Ada",
        "buyerPhone": BUYER_PHONE,
        "location": "Ikeja",
        "products": [],
    });
    let (first, second) = tokio::join!(
        app.send(Method::POST, "/api/orders/place", None, Some(order.clone())),
        app.send(Method::POST, "/api/orders/place", None, Some(order)),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    assert_eq!(app.stock_of(product.id).await, 3);
    let mut tx = app.db.begin().await.unwrap();
    assert_eq!(tx.orders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn counter_above_catalog_price_is_rejected_without_effect() {
    let app = TestApp::new();
    let (seller_id, product) = app.seed_seller("Ankara fabric", 1000.0, 5).await;
    let bargain_id = start_bargain(&app, product.id, 3, 2500.0).await;
    app.send(
        Method::POST,
        "/api/bargain/respond",
        Some(&app.seller_token(seller_id)),
        Some(json!({
            "bargainId": bargain_id,
            "action": "counter",
            "items": items(product.id, 3),
            "totalCounterPrice": 2800.0,
        })),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/bargain/buyer/respond",
            None,
            Some(json!({
                "bargainId": bargain_id,
                "action": "counter",
                "items": items(product.id, 3),
                "totalCounterPrice": 3500.0,
                "buyerPhone": BUYER_PHONE,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Counter price exceeds maximum value");

    let uri = format!("/api/bargain/{bargain_id}?buyerPhone={BUYER_PHONE}");
    let (status, body) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["buyerOffers"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"].get("buyerPhone").is_none());
}

#[tokio::test]
async fn opening_offer_above_catalog_creates_nothing() {
    let app = TestApp::new();
    let (_, product) = app.seed_seller("Ankara fabric", 1000.0, 5).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/bargain/start",
            None,
            Some(json!({
                "buyerName": "Ada",
                "buyerPhone": BUYER_PHONE,
                "items": items(product.id, 3),
                "totalOfferedPrice": 3100.0,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "totalOfferedPrice cannot exceed combined price of products (3000)"
    );

    let uri = format!("/api/bargain/buyer?buyerPhone={BUYER_PHONE}");
    let (_, body) = app.send(Method::GET, &uri, None, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn order_with_one_short_line_commits_nothing() {
    let app = TestApp::new();
    let (_, plenty) = app.seed_seller("Beads", 200.0, 5).await;
    let (_, scarce) = app.seed_seller("Gele", 800.0, 1).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/orders/place",
            None,
            Some(json!({
                "buyerName": "Ada",
                "buyerPhone": BUYER_PHONE,
                "location": "Ikeja",
                "products": [
                    { "productId": plenty.id, "quantity": 2 },
                    { "productId": scarce.id, "quantity": 3 },
                ],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Not enough stock for product Gele");

    assert_eq!(app.stock_of(plenty.id).await, 5);
    assert_eq!(app.stock_of(scarce.id).await, 1);
    let mut tx = app.db.begin().await.unwrap();
    assert!(tx.orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn explicit_order_price_must_be_positive() {
    let app = TestApp::new();
    let (_, product) = app.seed_seller("Beads", 200.0, 5).await;

    for price in [0.0, -5.0] {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/orders/place",
                None,
                Some(json!({
                    "buyerName": "Ada",
                    "buyerPhone": BUYER_PHONE,
                    "location": "Ikeja",
                    "products": [{ "productId": product.id, "quantity": 1, "price": price }],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "price {price}");
        assert_eq!(body["message"], "price must be a positive number");
    }

    assert_eq!(app.stock_of(product.id).await, 5);
    let mut tx = app.db.begin().await.unwrap();
    assert!(tx.orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn group_buy_fills_and_stays_full_after_payment() {
    let app = TestApp::new();
    let (seller_id, product) = app.seed_seller("Rice bag", 30000.0, 50).await;
    let seller = app.seller_token(seller_id);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/groupbuys/create",
            Some(&seller),
            Some(json!({
                "title": "Bulk rice",
                "pricePerUnit": 25000.0,
                "minParticipants": 3,
                "deadline": (Utc::now() + Duration::days(7)).to_rfc3339(),
                "productId": product.id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let group_id = body["data"]["id"].as_str().unwrap().to_string();
    let join_uri = format!("/api/groupbuys/join/{group_id}");

    let (_, body) = app
        .send(
            Method::POST,
            &join_uri,
            None,
            Some(json!({ "name": "Ada", "phone": BUYER_PHONE, "quantity": 2 })),
        )
        .await;
    assert_eq!(body["data"]["isFull"], false);

    let (status, body) = app
        .send(
            Method::POST,
            &join_uri,
            None,
            Some(json!({ "name": "Bola", "phone": "08099999999", "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only 1 slots left");

    let (_, body) = app
        .send(
            Method::POST,
            &join_uri,
            None,
            Some(json!({ "name": "Bola", "phone": "08099999999", "quantity": 1 })),
        )
        .await;
    assert_eq!(body["data"]["isFull"], true);
    assert_eq!(body["data"]["joinedQuantity"], 3);

    let (status, body) = app
        .send(
            Method::POST,
            &join_uri,
            None,
            Some(json!({ "name": "Chi", "phone": "08077777777", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Group buy is full");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/groupbuys/pay/{group_id}"),
            None,
            Some(json!({ "phone": BUYER_PHONE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = app.send(Method::GET, "/api/groupbuys/public", None, None).await;
    let listed = &body["data"][0];
    assert_eq!(listed["isFull"], true);
    assert_eq!(listed["joinedQuantity"], 5);
    assert_eq!(listed["paidParticipants"].as_array().unwrap().len(), 1);
    assert_eq!(listed["participants"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/groupbuys/{group_id}"),
            Some(&seller),
            Some(json!({ "title": "Changed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cart_sync_folds_accepted_bargains_and_client_lines() {
    let app = TestApp::new();
    let (seller_id, product) = app.seed_seller("Ankara fabric", 1000.0, 5).await;
    let (_, other) = app.seed_seller("Beads", 200.0, 5).await;

    let bargain_id = start_bargain(&app, product.id, 2, 1800.0).await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/bargain/respond",
            Some(&app.seller_token(seller_id)),
            Some(json!({ "bargainId": bargain_id, "action": "accept" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/cart/sync/{BUYER_PHONE}"),
            None,
            Some(json!({
                "cartItems": [{
                    "productId": other.id,
                    "quantity": 1,
                    "price": 200.0,
                }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let lines = body["data"]["items"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["isBargain"], true);
    assert_eq!(lines[0]["price"], 900.0);
    assert_eq!(lines[1]["productName"], "Unknown");

    let uri = format!("/api/bargain/{bargain_id}?buyerPhone={BUYER_PHONE}");
    let (_, body) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(body["data"]["addedToCart"], true);
}

#[tokio::test]
async fn repeated_single_add_replaces_the_product_line() {
    let app = TestApp::new();
    let (_, product) = app.seed_seller("Beads", 200.0, 5).await;

    for (quantity, price, is_bargain) in [(1, 200.0, false), (2, 180.0, true)] {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/cart/add",
                None,
                Some(json!({
                    "buyerPhone": BUYER_PHONE,
                    "productId": product.id,
                    "quantity": quantity,
                    "price": price,
                    "isBargain": is_bargain,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, body) = app
        .send(Method::GET, &format!("/api/cart/{BUYER_PHONE}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let lines = body["data"]["items"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["isBargain"], true);
    assert_eq!(lines[0]["quantity"], 2);
    assert_eq!(lines[0]["price"], 180.0);
}

#[tokio::test]
async fn rating_updates_score_and_seller_tracking() {
    let app = TestApp::new();
    let (seller_id, product) = app.seed_seller("Beads", 200.0, 5).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/orders/place",
            None,
            Some(json!({
                "buyerName": "Ada",
                "buyerPhone": BUYER_PHONE,
                "location": "Ikeja",
                "products": [{ "productId": product.id, "quantity": 1 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order_id = body["data"]["orderId"].as_str().unwrap().to_string();
    let buyer_token = body["data"]["token"].as_str().unwrap().to_string();
    let rate_uri = format!("/api/tracking/satisfaction/{order_id}");

    let stranger = app.token("08055555555", Role::Buyer);
    let (status, _) = app
        .send(
            Method::PUT,
            &rate_uri,
            Some(&stranger),
            Some(json!({ "satisfactionStatus": "Satisfied ❤" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::PUT,
            &rate_uri,
            Some(&buyer_token),
            Some(json!({ "satisfactionStatus": "Satisfied ❤" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["shipmentStatus"], "Delivered");

    {
        let mut tx = app.db.begin().await.unwrap();
        let store = tx.storefront(seller_id).await.unwrap().unwrap();
        assert_eq!(store.seller_score, 100.0);
    }

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/tracking/seller/{seller_id}"),
            Some(&app.seller_token(seller_id)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"][0]["shipmentStatus"], "Delivered");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/tracking/buyer",
            None,
            Some(json!({ "buyerPhone": "+2348012345678" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["orders"].as_array().unwrap().len(), 1);
    assert!(body["data"]["token"].as_str().is_some());
}

#[tokio::test]
async fn protected_routes_check_token_and_role() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/bargain/seller", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let (status, _) = app
        .send(Method::GET, "/api/bargain/seller", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let buyer = app.token(BUYER_PHONE, Role::Buyer);
    let (status, _) = app
        .send(Method::GET, "/api/bargain/seller", Some(&buyer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let seller_id = Uuid::new_v4();
    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/orders/seller/{}", Uuid::new_v4()),
            Some(&app.seller_token(seller_id)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::GET, "/api/orders", Some(&app.seller_token(seller_id)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_recompute_tags_top_sellers() {
    let app = TestApp::new();
    let (seller_id, product) = app.seed_seller("Beads", 200.0, 5).await;
    app.send(
        Method::POST,
        "/api/orders/place",
        None,
        Some(json!({
            "buyerName": "Ada",
            "buyerPhone": BUYER_PHONE,
            "location": "Ikeja",
            "products": [{ "productId": product.id, "quantity": 2 }],
        })),
    )
    .await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/orders/top-sellers-of-month/recompute",
            Some(&app.seller_token(seller_id)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.token("admin", Role::Admin);
    let (status, body) = app
        .send(
            Method::POST,
            "/api/orders/top-sellers-of-month/recompute",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = app
        .send(Method::GET, "/api/orders/top-sellers-of-month", None, None)
        .await;
    let tagged = body["data"].as_array().unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0]["sellerId"], seller_id.to_string());
    assert_eq!(tagged[0]["isTopSeller"], true);
}
