use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppJson, AppResult};
use crate::jobs::TopSellerJob;
use crate::middleware::{AdminUser, AuthenticatedUser, JwtKeys};
use crate::models::{
    ApiResponse, Order, PlaceFromCartRequest, PlaceOrderRequest, PlacedOrder, PreviewLine,
    Storefront, UpdateOrderStatusRequest,
};
use crate::services::{OrderService, Staff};

pub async fn place_order(
    State(service): State<Arc<OrderService>>,
    State(jwt): State<Arc<JwtKeys>>,
    AppJson(payload): AppJson<PlaceOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PlacedOrder>>)> {
    let order = service.place(payload).await?;
    placed(&jwt, order)
}

pub async fn place_order_from_cart(
    State(service): State<Arc<OrderService>>,
    State(jwt): State<Arc<JwtKeys>>,
    Path(buyer_phone): Path<String>,
    AppJson(payload): AppJson<PlaceFromCartRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PlacedOrder>>)> {
    let order = service.place_from_cart(&buyer_phone, payload).await?;
    placed(&jwt, order)
}

fn placed(jwt: &JwtKeys, order: Order) -> AppResult<(StatusCode, Json<ApiResponse<PlacedOrder>>)> {
    let token = jwt.issue_buyer_token(&order.buyer_phone)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Order placed successfully",
            PlacedOrder {
                order_id: order.order_id.clone(),
                token,
                order,
            },
        )),
    ))
}

pub async fn preview_order_items(
    State(service): State<Arc<OrderService>>,
    Path(buyer_phone): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<PreviewLine>>>> {
    let lines = service.preview(&buyer_phone).await?;
    Ok(Json(ApiResponse::ok("Order items fetched", lines)))
}

pub async fn buyer_orders(
    State(service): State<Arc<OrderService>>,
    Path(buyer_phone): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = service.buyer_orders(&buyer_phone).await?;
    Ok(Json(ApiResponse::ok("Orders fetched", orders)))
}

pub async fn seller_orders(
    State(service): State<Arc<OrderService>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(seller_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    match Staff::from_claims(&claims)? {
        Staff::Seller(own_id) if own_id != seller_id => {
            return Err(AppError::forbidden("Not authorized to view these orders"));
        }
        _ => {}
    }
    let orders = service.seller_orders(seller_id).await?;
    Ok(Json(ApiResponse::ok("Orders fetched", orders)))
}

pub async fn all_orders(
    State(service): State<Arc<OrderService>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = service.all_orders().await?;
    Ok(Json(ApiResponse::ok("Orders fetched", orders)))
}

pub async fn update_order_status(
    State(service): State<Arc<OrderService>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(order_id): Path<String>,
    AppJson(payload): AppJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let staff = Staff::from_claims(&claims)?;
    let order = service.update_status(staff, &order_id, payload).await?;
    Ok(Json(ApiResponse::ok("Order status updated", order)))
}

pub async fn top_sellers_of_month(
    State(job): State<Arc<TopSellerJob>>,
) -> AppResult<Json<ApiResponse<Vec<Storefront>>>> {
    let stores = job.tagged().await?;
    Ok(Json(ApiResponse::ok("Top sellers fetched", stores)))
}

pub async fn recompute_top_sellers(
    State(job): State<Arc<TopSellerJob>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<Vec<Storefront>>>> {
    let stores = job.run_current_month().await?;
    Ok(Json(ApiResponse::ok("Top sellers recomputed", stores)))
}
