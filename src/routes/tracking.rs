use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

pub fn tracking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tracking/buyer", post(track_buyer))
        .route("/api/tracking/seller/:sellerId", get(track_seller))
        .route("/api/tracking/shipment/:orderId", put(update_shipment))
        .route("/api/tracking/satisfaction/:orderId", put(update_satisfaction))
}
