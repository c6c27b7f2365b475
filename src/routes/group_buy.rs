use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

pub fn group_buy_routes() -> Router<AppState> {
    Router::new()
        .route("/api/groupbuys/create", post(create_group_buy))
        .route("/api/groupbuys/public", get(public_group_buys))
        .route("/api/groupbuys/seller", get(seller_group_buys))
        .route("/api/groupbuys/join/:id", post(join_group_buy))
        .route("/api/groupbuys/pay/:id", post(pay_group_buy))
        .route("/api/groupbuys/visibility/:id", patch(set_group_buy_visibility))
        .route("/api/groupbuys/mark-ready/:id", patch(mark_group_buy_ready))
        .route(
            "/api/groupbuys/successful/:buyerPhone",
            get(successful_group_buy_items),
        )
        .route("/api/groupbuys/:id/add-to-cart", post(add_group_buy_to_cart))
        .route(
            "/api/groupbuys/:id",
            put(update_group_buy).delete(delete_group_buy),
        )
}
