use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppJson, AppResult};
use crate::middleware::SellerUser;
use crate::models::{
    ApiResponse, Cart, CreateGroupBuyRequest, GroupBuyItemView, GroupBuyView, JoinGroupBuyRequest,
    PayGroupBuyRequest, PhoneBody, PublicGroupBuyQuery, UpdateGroupBuyRequest, VisibilityRequest,
};
use crate::services::GroupBuyService;

pub async fn create_group_buy(
    State(service): State<Arc<GroupBuyService>>,
    seller: SellerUser,
    AppJson(payload): AppJson<CreateGroupBuyRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<GroupBuyView>>)> {
    let group = service.create(seller.seller_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Group buy created", group)),
    ))
}

pub async fn public_group_buys(
    State(service): State<Arc<GroupBuyService>>,
    Query(query): Query<PublicGroupBuyQuery>,
) -> AppResult<Json<ApiResponse<Vec<GroupBuyView>>>> {
    let groups = service.public(query.seller_id).await?;
    Ok(Json(ApiResponse::ok("Group buys fetched", groups)))
}

pub async fn seller_group_buys(
    State(service): State<Arc<GroupBuyService>>,
    seller: SellerUser,
) -> AppResult<Json<ApiResponse<Vec<GroupBuyView>>>> {
    let groups = service.for_seller(seller.seller_id).await?;
    Ok(Json(ApiResponse::ok("Group buys fetched", groups)))
}

pub async fn join_group_buy(
    State(service): State<Arc<GroupBuyService>>,
    Path(group_id): Path<Uuid>,
    AppJson(payload): AppJson<JoinGroupBuyRequest>,
) -> AppResult<Json<ApiResponse<GroupBuyView>>> {
    let group = service.join(group_id, payload).await?;
    Ok(Json(ApiResponse::ok("Joined group buy", group)))
}

pub async fn pay_group_buy(
    State(service): State<Arc<GroupBuyService>>,
    Path(group_id): Path<Uuid>,
    AppJson(payload): AppJson<PayGroupBuyRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    service.pay(group_id, payload).await?;
    Ok(Json(ApiResponse::message("Payment recorded")))
}

pub async fn add_group_buy_to_cart(
    State(service): State<Arc<GroupBuyService>>,
    Path(group_id): Path<Uuid>,
    AppJson(payload): AppJson<PhoneBody>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = service.add_to_cart(group_id, &payload.phone).await?;
    Ok(Json(ApiResponse::ok("Group buy added to cart", cart)))
}

pub async fn update_group_buy(
    State(service): State<Arc<GroupBuyService>>,
    seller: SellerUser,
    Path(group_id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateGroupBuyRequest>,
) -> AppResult<Json<ApiResponse<GroupBuyView>>> {
    let group = service.update(seller.seller_id, group_id, payload).await?;
    Ok(Json(ApiResponse::ok("Group buy updated", group)))
}

pub async fn delete_group_buy(
    State(service): State<Arc<GroupBuyService>>,
    seller: SellerUser,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    service.delete(seller.seller_id, group_id).await?;
    Ok(Json(ApiResponse::message("Group buy deleted")))
}

pub async fn set_group_buy_visibility(
    State(service): State<Arc<GroupBuyService>>,
    seller: SellerUser,
    Path(group_id): Path<Uuid>,
    AppJson(payload): AppJson<VisibilityRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    service
        .set_visibility(seller.seller_id, group_id, payload.visible)
        .await?;
    let message = if payload.visible {
        "Group buy is now visible"
    } else {
        "Group buy is now hidden"
    };
    Ok(Json(ApiResponse::message(message)))
}

pub async fn mark_group_buy_ready(
    State(service): State<Arc<GroupBuyService>>,
    seller: SellerUser,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    service.mark_ready(seller.seller_id, group_id).await?;
    Ok(Json(ApiResponse::message("Group buy marked ready")))
}

pub async fn successful_group_buy_items(
    State(service): State<Arc<GroupBuyService>>,
    Path(buyer_phone): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<GroupBuyItemView>>>> {
    let items = service.successful_items(&buyer_phone).await?;
    Ok(Json(ApiResponse::ok("Successful group buys fetched", items)))
}
