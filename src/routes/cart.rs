use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart/add", post(add_cart_item))
        .route("/api/cart/clear", delete(clear_cart))
        .route("/api/cart/sync/:buyerPhone", post(sync_cart))
        .route(
            "/api/cart/remove/:buyerPhone/:productId",
            delete(remove_cart_item),
        )
        .route("/api/cart/:buyerPhone", get(get_cart))
}
