use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::{AuthenticatedUser, BuyerUser, JwtKeys, SellerUser};
use crate::models::{
    normalize_phone, ApiResponse, BuyerPhoneBody, SatisfactionOutcome, SatisfactionUpdateRequest,
    ShipmentUpdateRequest, TrackedOrder,
};
use crate::services::tracking_service::BuyerTracking;
use crate::services::{Staff, TrackingService};

/// Buyer tracking plus a fresh token for follow-up calls.
#[derive(Debug, Serialize)]
pub struct BuyerTrackingResponse {
    #[serde(flatten)]
    pub tracking: BuyerTracking,
    pub token: String,
}

pub async fn track_buyer(
    State(service): State<Arc<TrackingService>>,
    State(jwt): State<Arc<JwtKeys>>,
    AppJson(payload): AppJson<BuyerPhoneBody>,
) -> AppResult<Json<ApiResponse<BuyerTrackingResponse>>> {
    let tracking = service.for_buyer(&payload.buyer_phone).await?;
    let token = jwt.issue_buyer_token(&normalize_phone(&payload.buyer_phone))?;
    Ok(Json(ApiResponse::ok(
        "Tracking data fetched",
        BuyerTrackingResponse { tracking, token },
    )))
}

pub async fn track_seller(
    State(service): State<Arc<TrackingService>>,
    seller: SellerUser,
    Path(seller_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<TrackedOrder>>>> {
    if seller.seller_id != seller_id {
        return Err(AppError::forbidden("Not authorized to view these orders"));
    }
    let orders = service.for_seller(seller_id).await?;
    Ok(Json(ApiResponse::ok("Tracking data fetched", orders)))
}

pub async fn update_shipment(
    State(service): State<Arc<TrackingService>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(order_id): Path<String>,
    AppJson(payload): AppJson<ShipmentUpdateRequest>,
) -> AppResult<Json<ApiResponse<TrackedOrder>>> {
    let staff = Staff::from_claims(&claims)?;
    let order = service.update_shipment(staff, &order_id, payload.status).await?;
    Ok(Json(ApiResponse::ok("Shipment status updated", order)))
}

pub async fn update_satisfaction(
    State(service): State<Arc<TrackingService>>,
    buyer: BuyerUser,
    Path(order_id): Path<String>,
    AppJson(payload): AppJson<SatisfactionUpdateRequest>,
) -> AppResult<Json<ApiResponse<SatisfactionOutcome>>> {
    let outcome = service
        .rate(&buyer.phone, &order_id, payload.satisfaction_status)
        .await?;
    Ok(Json(ApiResponse::ok("Satisfaction status updated", outcome)))
}
