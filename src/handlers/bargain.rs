use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::SellerUser;
use crate::models::{
    ApiResponse, BargainItemView, BargainView, BuyerBargainView, BuyerPhoneBody, BuyerPhoneQuery,
    Cart, RespondOutcome, RespondRequest, StartBargainRequest,
};
use crate::services::BargainService;

pub async fn start_bargain(
    State(service): State<Arc<BargainService>>,
    AppJson(payload): AppJson<StartBargainRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BargainView>>)> {
    let bargain = service.start(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Bargain started", bargain)),
    ))
}

pub async fn seller_respond(
    State(service): State<Arc<BargainService>>,
    seller: SellerUser,
    AppJson(payload): AppJson<RespondRequest>,
) -> AppResult<Json<ApiResponse<RespondOutcome>>> {
    let outcome = service.respond_as_seller(seller.seller_id, payload).await?;
    Ok(Json(ApiResponse::ok("Bargain updated", outcome)))
}

pub async fn buyer_respond(
    State(service): State<Arc<BargainService>>,
    AppJson(payload): AppJson<RespondRequest>,
) -> AppResult<Json<ApiResponse<RespondOutcome>>> {
    let outcome = service.respond_as_buyer(payload).await?;
    Ok(Json(ApiResponse::ok("Bargain updated", outcome)))
}

pub async fn add_bargain_to_cart(
    State(service): State<Arc<BargainService>>,
    Path(bargain_id): Path<Uuid>,
    AppJson(payload): AppJson<BuyerPhoneBody>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = service.add_to_cart(bargain_id, &payload.buyer_phone).await?;
    Ok(Json(ApiResponse::ok("Bargain added to cart", cart)))
}

pub async fn seller_bargains(
    State(service): State<Arc<BargainService>>,
    seller: SellerUser,
) -> AppResult<Json<ApiResponse<Vec<BargainView>>>> {
    let bargains = service.seller_bargains(seller.seller_id).await?;
    Ok(Json(ApiResponse::ok("Bargains fetched", bargains)))
}

pub async fn buyer_bargains(
    State(service): State<Arc<BargainService>>,
    Query(query): Query<BuyerPhoneQuery>,
) -> AppResult<Json<ApiResponse<Vec<BargainView>>>> {
    let phone = required(query.buyer_phone)?;
    let bargains = service.buyer_bargains(&phone).await?;
    Ok(Json(ApiResponse::ok("Bargains fetched", bargains)))
}

pub async fn get_bargain(
    State(service): State<Arc<BargainService>>,
    Path(id): Path<Uuid>,
    Query(query): Query<BuyerPhoneQuery>,
) -> AppResult<Json<ApiResponse<BuyerBargainView>>> {
    let phone = required(query.buyer_phone)?;
    let bargain = service.bargain_for_buyer(id, &phone).await?;
    Ok(Json(ApiResponse::ok("Bargain fetched", bargain)))
}

pub async fn successful_bargain_items(
    State(service): State<Arc<BargainService>>,
    Path(buyer_phone): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<BargainItemView>>>> {
    let items = service.successful_items(&buyer_phone).await?;
    Ok(Json(ApiResponse::ok("Successful bargains fetched", items)))
}

pub async fn delete_bargain(
    State(service): State<Arc<BargainService>>,
    seller: SellerUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    service.delete(seller.seller_id, id).await?;
    Ok(Json(ApiResponse::message("Bargain deleted")))
}

fn required(buyer_phone: Option<String>) -> AppResult<String> {
    buyer_phone
        .filter(|phone| !phone.trim().is_empty())
        .ok_or_else(|| AppError::validation("buyerPhone is required"))
}
