use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppJson, AppResult};
use crate::models::{AddCartItemRequest, ApiResponse, Cart, ClearCartRequest, SyncCartRequest};
use crate::services::CartService;

pub async fn get_cart(
    State(service): State<Arc<CartService>>,
    Path(buyer_phone): Path<String>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = service.get(&buyer_phone).await?;
    Ok(Json(ApiResponse::ok("Cart fetched", cart)))
}

pub async fn add_cart_item(
    State(service): State<Arc<CartService>>,
    AppJson(payload): AppJson<AddCartItemRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = service.add_item(payload).await?;
    Ok(Json(ApiResponse::ok("Item added to cart", cart)))
}

pub async fn remove_cart_item(
    State(service): State<Arc<CartService>>,
    Path((buyer_phone, product_id)): Path<(String, Uuid)>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = service.remove_item(&buyer_phone, product_id).await?;
    Ok(Json(ApiResponse::ok("Item removed from cart", cart)))
}

pub async fn clear_cart(
    State(service): State<Arc<CartService>>,
    AppJson(payload): AppJson<ClearCartRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    service.clear(&payload.buyer_phone).await?;
    Ok(Json(ApiResponse::message("Cart cleared")))
}

pub async fn sync_cart(
    State(service): State<Arc<CartService>>,
    Path(buyer_phone): Path<String>,
    AppJson(payload): AppJson<SyncCartRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = service.sync(&buyer_phone, payload).await?;
    Ok(Json(ApiResponse::ok("Cart synced", cart)))
}
