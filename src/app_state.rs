//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::AppConfig;
use crate::jobs::TopSellerJob;
use crate::middleware::JwtKeys;
use crate::services::{BargainService, CartService, GroupBuyService, OrderService, TrackingService};
use crate::store::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bargain_service: Arc<BargainService>,
    pub group_buy_service: Arc<GroupBuyService>,
    pub cart_service: Arc<CartService>,
    pub order_service: Arc<OrderService>,
    pub tracking_service: Arc<TrackingService>,
    pub top_seller_job: Arc<TopSellerJob>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, config: &AppConfig) -> Self {
        Self {
            bargain_service: Arc::new(BargainService::new(db.clone())),
            group_buy_service: Arc::new(GroupBuyService::new(db.clone())),
            cart_service: Arc::new(CartService::new(db.clone())),
            order_service: Arc::new(OrderService::new(db.clone())),
            tracking_service: Arc::new(TrackingService::new(db.clone())),
            top_seller_job: Arc::new(TopSellerJob::new(db, config.top_seller_limit)),
            jwt: Arc::new(JwtKeys::new(&config.jwt_secret, config.buyer_token_ttl_days)),
        }
    }
}

impl FromRef<AppState> for Arc<BargainService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.bargain_service.clone()
    }
}

impl FromRef<AppState> for Arc<GroupBuyService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.group_buy_service.clone()
    }
}

impl FromRef<AppState> for Arc<CartService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.cart_service.clone()
    }
}

impl FromRef<AppState> for Arc<OrderService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.order_service.clone()
    }
}

impl FromRef<AppState> for Arc<TrackingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.tracking_service.clone()
    }
}

impl FromRef<AppState> for Arc<TopSellerJob> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.top_seller_job.clone()
    }
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.jwt.clone()
    }
}
