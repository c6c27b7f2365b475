use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::not_blank;

const ORDER_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ORDER_ID_SUFFIX_LEN: usize = 4;

/// Human-readable order id, e.g. `TRADY-20250615-X7F9`.
pub fn generate_order_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ORDER_ID_SUFFIX_LEN)
        .map(|_| ORDER_ID_ALPHABET[rng.gen_range(0..ORDER_ID_ALPHABET.len())] as char)
        .collect();
    format!("TRADY-{}-{}", now.format("%Y%m%d"), suffix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeliveryStatus {
    #[default]
    Processing,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SatisfactionStatus {
    #[default]
    Unrated,
    #[serde(rename = "Satisfied ❤", alias = "Satisfied ❤️")]
    Satisfied,
    #[serde(rename = "I Like It 💛")]
    LikedIt,
    Refund,
}

impl SatisfactionStatus {
    /// Weight of the rating in the seller score.
    pub fn score_weight(&self) -> f64 {
        match self {
            Self::Satisfied => 1.0,
            Self::LikedIt => 0.5,
            Self::Unrated | Self::Refund => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "with Trady")]
    WithTrady,
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "refund")]
    Refund,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Processing,
    Success,
    Failed,
}

/// Purchased line, frozen at placement time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub price: f64,
    pub seller_id: Uuid,
    #[serde(default)]
    pub is_bargain: bool,
    #[serde(default)]
    pub is_group_buy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bargain_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_buy_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_id: String,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_location: String,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    #[serde(default)]
    pub satisfaction_status: SatisfactionStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub order_status: OrderStatus,
    pub products: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Freshly placed order: paid, processing delivery, unrated.
    pub fn placed(
        order_id: String,
        buyer_name: &str,
        buyer_phone: &str,
        buyer_location: &str,
        products: Vec<OrderLine>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            buyer_name: buyer_name.trim().to_string(),
            buyer_phone: buyer_phone.to_string(),
            buyer_location: buyer_location.trim().to_string(),
            delivery_status: DeliveryStatus::Processing,
            satisfaction_status: SatisfactionStatus::Unrated,
            payment_status: PaymentStatus::Success,
            order_status: OrderStatus::Success,
            products,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn involves_seller(&self, seller_id: Uuid) -> bool {
        self.products.iter().any(|line| line.seller_id == seller_id)
    }

    /// Distinct sellers, in line order.
    pub fn seller_ids(&self) -> Vec<Uuid> {
        let mut sellers = Vec::new();
        for line in &self.products {
            if !sellers.contains(&line.seller_id) {
                sellers.push(line.seller_id);
            }
        }
        sellers
    }

    /// Counts toward seller reputation.
    pub fn is_settled(&self) -> bool {
        self.payment_status == PaymentStatus::Success && self.order_status == OrderStatus::Success
    }

    /// Copy with only `seller_id`'s lines.
    pub fn for_seller(&self, seller_id: Uuid) -> Order {
        let mut order = self.clone();
        order.products.retain(|line| line.seller_id == seller_id);
        order
    }

    /// Delivery as the seller sees it: a rated order counts as delivered.
    pub fn seller_shipment_status(&self) -> DeliveryStatus {
        if self.satisfaction_status != SatisfactionStatus::Unrated {
            DeliveryStatus::Delivered
        } else {
            self.delivery_status
        }
    }

    pub fn rate(&mut self, satisfaction: SatisfactionStatus, now: DateTime<Utc>) {
        self.satisfaction_status = satisfaction;
        self.delivery_status = DeliveryStatus::Delivered;
        self.updated_at = now;
    }
}

/// 100 x (satisfied + 0.5 x liked) / settled orders involving the seller.
pub fn seller_score<'a, I>(orders: I, seller_id: Uuid) -> f64
where
    I: IntoIterator<Item = &'a Order>,
{
    let (total, weighted) = orders
        .into_iter()
        .filter(|order| order.is_settled() && order.involves_seller(seller_id))
        .fold((0u32, 0.0f64), |(total, weighted), order| {
            (total + 1, weighted + order.satisfaction_status.score_weight())
        });
    if total == 0 {
        0.0
    } else {
        weighted / f64::from(total) * 100.0
    }
}

// ===== Request DTOs =====

/// Explicit product line supplied by the buyer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductRequest {
    pub product_id: Uuid,
    pub quantity: i64,
    pub price: Option<f64>,
    pub product_name: Option<String>,
    pub seller_id: Option<Uuid>,
    pub bargain_id: Option<Uuid>,
    pub group_buy_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub buyer_name: String,
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub buyer_phone: String,
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub location: String,
    #[serde(default)]
    pub products: Vec<OrderProductRequest>,
}

/// Order from the stored cart; the phone comes from the path.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceFromCartRequest {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub buyer_name: String,
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub location: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub delivery_status: Option<DeliveryStatus>,
    pub satisfaction_status: Option<SatisfactionStatus>,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ShipmentUpdateRequest {
    pub status: DeliveryStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SatisfactionUpdateRequest {
    pub satisfaction_status: SatisfactionStatus,
}

// ===== Response views =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: String,
    pub token: String,
    pub order: Order,
}

/// Where a previewed order line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LineSource {
    Bargain,
    GroupBuy,
    Cart,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLine {
    #[serde(flatten)]
    pub line: OrderLine,
    pub source: LineSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub shipment_status: DeliveryStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SatisfactionOutcome {
    pub order_id: String,
    pub status: SatisfactionStatus,
    pub shipment_status: DeliveryStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with(seller: Uuid, satisfaction: SatisfactionStatus) -> Order {
        let mut order = Order::placed(
            "TRADY-20250101-AAAA".into(),
            "Ada",
            "0801",
            "Lagos",
            vec![OrderLine {
                product_id: Uuid::new_v4(),
                product_name: "Yam".into(),
                quantity: 1,
                price: 100.0,
                seller_id: seller,
                is_bargain: false,
                is_group_buy: false,
                bargain_id: None,
                group_buy_id: None,
            }],
            Utc::now(),
        );
        order.satisfaction_status = satisfaction;
        order
    }

    #[test]
    fn order_id_has_date_and_suffix() {
        let now = Utc::now();
        let id = generate_order_id(now);
        let prefix = format!("TRADY-{}-", now.format("%Y%m%d"));
        assert!(id.starts_with(&prefix));
        let suffix = &id[prefix.len()..];
        assert_eq!(suffix.len(), 4);
        assert!(suffix.bytes().all(|b| ORDER_ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn status_labels_match_wire_format() {
        assert_eq!(
            serde_json::to_value(DeliveryStatus::OutForDelivery).unwrap(),
            "Out for Delivery"
        );
        assert_eq!(serde_json::to_value(PaymentStatus::Success).unwrap(), "success");
        let liked: SatisfactionStatus = serde_json::from_str("\"I Like It 💛\"").unwrap();
        assert_eq!(liked, SatisfactionStatus::LikedIt);
        let satisfied: SatisfactionStatus = serde_json::from_str("\"Satisfied ❤️\"").unwrap();
        assert_eq!(satisfied, SatisfactionStatus::Satisfied);
    }

    #[test]
    fn score_weights_ratings_over_settled_orders() {
        let seller = Uuid::new_v4();
        let mut unsettled = order_with(seller, SatisfactionStatus::Satisfied);
        unsettled.order_status = OrderStatus::Failed;
        let orders = vec![
            order_with(seller, SatisfactionStatus::Satisfied),
            order_with(seller, SatisfactionStatus::LikedIt),
            order_with(seller, SatisfactionStatus::Unrated),
            order_with(seller, SatisfactionStatus::Refund),
            order_with(Uuid::new_v4(), SatisfactionStatus::Satisfied),
            unsettled,
        ];
        assert!((seller_score(&orders, seller) - 37.5).abs() < 1e-9);
        assert_eq!(seller_score(&orders, Uuid::new_v4()), 0.0);
    }

    #[test]
    fn rating_marks_delivery_done() {
        let mut order = order_with(Uuid::new_v4(), SatisfactionStatus::Unrated);
        assert_eq!(order.seller_shipment_status(), DeliveryStatus::Processing);
        order.rate(SatisfactionStatus::Refund, Utc::now());
        assert_eq!(order.delivery_status, DeliveryStatus::Delivered);
        assert_eq!(order.seller_shipment_status(), DeliveryStatus::Delivered);
    }
}
