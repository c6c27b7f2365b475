use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

// Path segments sharing a position must share a parameter name.
pub fn bargain_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bargain/start", post(start_bargain))
        .route("/api/bargain/respond", post(seller_respond))
        .route("/api/bargain/buyer/respond", post(buyer_respond))
        .route("/api/bargain/seller", get(seller_bargains))
        .route("/api/bargain/buyer", get(buyer_bargains))
        .route(
            "/api/bargain/successful/:buyerPhone",
            get(successful_bargain_items),
        )
        .route("/api/bargain/:id/add-to-cart", post(add_bargain_to_cart))
        .route("/api/bargain/:id", get(get_bargain).delete(delete_bargain))
}
