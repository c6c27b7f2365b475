use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(all_orders))
        .route("/api/orders/place", post(place_order))
        .route(
            "/api/orders/items/:buyerPhone",
            get(preview_order_items).post(place_order_from_cart),
        )
        .route("/api/orders/buyer/:buyerPhone", get(buyer_orders))
        .route("/api/orders/seller/:sellerId", get(seller_orders))
        .route("/api/orders/status/:orderId", put(update_order_status))
        .route("/api/orders/top-sellers-of-month", get(top_sellers_of_month))
        .route(
            "/api/orders/top-sellers-of-month/recompute",
            post(recompute_top_sellers),
        )
}
