use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    normalize_phone, seller_score, BargainView, DeliveryStatus, SatisfactionOutcome,
    SatisfactionStatus, TrackedOrder,
};
use crate::services::Staff;
use crate::store::{Database, Tx};

/// Everything a buyer can follow up on.
#[derive(Debug, Serialize)]
pub struct BuyerTracking {
    pub orders: Vec<TrackedOrder>,
    pub bargains: Vec<BargainView>,
}

pub struct TrackingService {
    db: Arc<dyn Database>,
}

impl TrackingService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn for_buyer(&self, buyer_phone: &str) -> AppResult<BuyerTracking> {
        let phone = normalize_phone(buyer_phone);
        if phone.is_empty() {
            return Err(AppError::validation("Buyer phone is required"));
        }

        let mut tx = self.db.begin().await?;
        let mut orders = tx.orders_by_buyer(&phone).await?;
        let mut bargains = tx.bargains_by_buyer(&phone).await?;
        if orders.is_empty() && bargains.is_empty() {
            return Err(AppError::not_found("No orders or bargains found for this buyer"));
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bargains.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(BuyerTracking {
            orders: orders
                .into_iter()
                .map(|order| TrackedOrder {
                    shipment_status: order.delivery_status,
                    order,
                })
                .collect(),
            bargains: bargains.iter().map(BargainView::from).collect(),
        })
    }

    /// Seller's slice of every order they sold into.
    pub async fn for_seller(&self, seller_id: Uuid) -> AppResult<Vec<TrackedOrder>> {
        let mut tx = self.db.begin().await?;
        let mut orders = tx.orders_by_seller(seller_id).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders
            .iter()
            .map(|order| TrackedOrder {
                shipment_status: order.seller_shipment_status(),
                order: order.for_seller(seller_id),
            })
            .collect())
    }

    pub async fn update_shipment(
        &self,
        staff: Staff,
        order_id: &str,
        status: DeliveryStatus,
    ) -> AppResult<TrackedOrder> {
        let mut tx = self.db.begin().await?;
        let mut order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order not found"))?;
        staff.authorize(&order)?;

        order.delivery_status = status;
        order.updated_at = Utc::now();
        tx.save_order(&order).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.order_id, status = ?status, "Shipment status updated");
        Ok(TrackedOrder {
            shipment_status: order.delivery_status,
            order,
        })
    }

    /// Records the buyer's rating, closes delivery and refreshes the score of
    /// every seller on the order.
    pub async fn rate(
        &self,
        buyer_phone: &str,
        order_id: &str,
        satisfaction: SatisfactionStatus,
    ) -> AppResult<SatisfactionOutcome> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let mut order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order not found"))?;
        if order.buyer_phone != normalize_phone(buyer_phone) {
            return Err(AppError::forbidden("Not authorized to rate this order"));
        }

        order.rate(satisfaction, now);
        tx.save_order(&order).await?;
        refresh_seller_scores(tx.as_mut(), &order.seller_ids(), now).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.order_id, satisfaction = ?satisfaction, "Order rated");
        Ok(SatisfactionOutcome {
            order_id: order.order_id,
            status: order.satisfaction_status,
            shipment_status: order.delivery_status,
        })
    }
}

/// Recomputes and stores the reputation score of each seller.
pub(crate) async fn refresh_seller_scores(
    tx: &mut dyn Tx,
    sellers: &[Uuid],
    now: DateTime<Utc>,
) -> AppResult<()> {
    for &seller_id in sellers {
        let orders = tx.orders_by_seller(seller_id).await?;
        let score = seller_score(&orders, seller_id);
        let Some(mut store) = tx.storefront(seller_id).await? else {
            tracing::debug!(seller_id = %seller_id, "No storefront to score");
            continue;
        };
        store.seller_score = score;
        store.updated_at = now;
        tx.save_storefront(&store).await?;
        tracing::debug!(seller_id = %seller_id, score, "Seller score refreshed");
    }
    Ok(())
}
