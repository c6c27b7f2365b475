//! Trady marketplace backend
//!
//! Bargaining, group buys, carts, order placement and order tracking for the
//! Trady marketplace, served over a JSON API.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Full application router with tracing and CORS layers applied.
pub fn create_router(state: AppState, cors_allowed_origins: Option<&str>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .merge(routes::bargain_routes())
        .merge(routes::group_buy_routes())
        .merge(routes::cart_routes())
        .merge(routes::order_routes())
        .merge(routes::tracking_routes())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::build_cors_layer(cors_allowed_origins))
        .with_state(state)
}
