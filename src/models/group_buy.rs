use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::{LifecycleError, SourceLifecycle};
use super::not_blank;
use super::product::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupBuyStatus {
    #[default]
    Open,
    Full,
    Ready,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupBuyError {
    #[error("Invalid quantity")]
    InvalidQuantity,
    #[error("Already joined")]
    AlreadyJoined,
    #[error("Group buy is full")]
    Full,
    #[error("Only {0} slots left")]
    NotEnoughSlots(u32),
    #[error("Already paid")]
    AlreadyPaid,
    #[error("Join the group before paying")]
    NotJoined,
    #[error("Not paid yet")]
    NotPaid,
    #[error("Already in cart")]
    AlreadyInCart,
    #[error("Group buy participation is not reserved in a cart")]
    NotReserved,
    #[error("Cannot edit a group buy with participants")]
    HasParticipants,
}

impl From<LifecycleError> for GroupBuyError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::AlreadyReserved => Self::AlreadyInCart,
            LifecycleError::NotReserved => Self::NotReserved,
        }
    }
}

/// Joined participant. Paying adds a paid record and keeps this entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub name: String,
    pub phone: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidParticipant {
    pub phone: String,
    pub quantity: u32,
    pub paid_at: DateTime<Utc>,
    #[serde(default)]
    pub lifecycle: SourceLifecycle,
}

/// Seller-defined bulk deal. `min_participants` counts units, not people.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBuy {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_per_unit: f64,
    pub min_participants: u32,
    pub deadline: DateTime<Utc>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub paid_participants: Vec<PaidParticipant>,
    #[serde(default)]
    pub status: GroupBuyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_visible() -> bool {
    true
}

impl GroupBuy {
    pub fn new(seller_id: Uuid, request: CreateGroupBuyRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seller_id,
            product_id: request.product_id,
            title: request.title.trim().to_string(),
            description: request.description.unwrap_or_default(),
            price_per_unit: request.price_per_unit,
            min_participants: request.min_participants,
            deadline: request.deadline,
            visible: true,
            participants: Vec::new(),
            paid_participants: Vec::new(),
            status: GroupBuyStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    /// Units pledged across both joined and paid participants.
    pub fn joined_quantity(&self) -> u32 {
        let unpaid: u32 = self.participants.iter().map(|p| p.quantity).sum();
        let paid: u32 = self.paid_participants.iter().map(|p| p.quantity).sum();
        unpaid + paid
    }

    pub fn is_full(&self) -> bool {
        self.joined_quantity() >= self.min_participants
    }

    pub fn slots_left(&self) -> u32 {
        self.min_participants.saturating_sub(self.joined_quantity())
    }

    fn has_joined(&self, phone: &str) -> bool {
        self.participants.iter().any(|p| p.phone == phone)
            || self.paid_participants.iter().any(|p| p.phone == phone)
    }

    /// One-way `open -> full` flip.
    fn refresh_status(&mut self) {
        if self.status == GroupBuyStatus::Open && self.is_full() {
            self.status = GroupBuyStatus::Full;
        }
    }

    pub fn join(
        &mut self,
        name: &str,
        phone: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<(), GroupBuyError> {
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(GroupBuyError::InvalidQuantity)?;
        if self.has_joined(phone) {
            return Err(GroupBuyError::AlreadyJoined);
        }
        let slots_left = self.slots_left();
        if slots_left == 0 {
            return Err(GroupBuyError::Full);
        }
        if quantity > slots_left {
            return Err(GroupBuyError::NotEnoughSlots(slots_left));
        }

        self.participants.push(Participant {
            name: name.trim().to_string(),
            phone: phone.to_string(),
            quantity,
        });
        self.refresh_status();
        self.updated_at = now;
        Ok(())
    }

    /// Records payment for a joined participant, who stays in `participants`.
    /// Without an explicit quantity the joined quantity is paid for.
    pub fn pay(
        &mut self,
        phone: &str,
        quantity: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<&PaidParticipant, GroupBuyError> {
        if self.paid_participants.iter().any(|p| p.phone == phone) {
            return Err(GroupBuyError::AlreadyPaid);
        }
        let joined = self
            .participants
            .iter()
            .find(|p| p.phone == phone)
            .map(|p| p.quantity)
            .ok_or(GroupBuyError::NotJoined)?;
        let quantity = match quantity {
            None => joined,
            Some(q) => u32::try_from(q)
                .ok()
                .filter(|q| *q > 0)
                .ok_or(GroupBuyError::InvalidQuantity)?,
        };

        self.paid_participants.push(PaidParticipant {
            phone: phone.to_string(),
            quantity,
            paid_at: now,
            lifecycle: SourceLifecycle::Available,
        });
        self.refresh_status();
        self.updated_at = now;
        Ok(&self.paid_participants[self.paid_participants.len() - 1])
    }

    fn paid_mut(&mut self, phone: &str) -> Option<&mut PaidParticipant> {
        self.paid_participants.iter_mut().find(|p| p.phone == phone)
    }

    pub fn paid(&self, phone: &str) -> Option<&PaidParticipant> {
        self.paid_participants.iter().find(|p| p.phone == phone)
    }

    /// Paid participation still waiting to be taken into a cart.
    pub fn pending_pickup(&self, phone: &str) -> Option<&PaidParticipant> {
        self.paid(phone).filter(|p| p.lifecycle.is_available())
    }

    /// Reserves the participant's paid seat for their cart and returns the
    /// quantity to add.
    pub fn reserve_for_cart(&mut self, phone: &str, now: DateTime<Utc>) -> Result<u32, GroupBuyError> {
        let paid = self.paid_mut(phone).ok_or(GroupBuyError::NotPaid)?;
        paid.lifecycle.reserve(phone, now)?;
        let quantity = paid.quantity;
        self.updated_at = now;
        Ok(quantity)
    }

    pub fn consume(&mut self, phone: &str, order_id: &str, now: DateTime<Utc>) -> Result<(), GroupBuyError> {
        let paid = self.paid_mut(phone).ok_or(GroupBuyError::NotPaid)?;
        paid.lifecycle.consume(order_id, now)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn update_terms(&mut self, update: UpdateGroupBuyRequest, now: DateTime<Utc>) -> Result<(), GroupBuyError> {
        if !self.participants.is_empty() || !self.paid_participants.is_empty() {
            return Err(GroupBuyError::HasParticipants);
        }
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price_per_unit {
            self.price_per_unit = price;
        }
        if let Some(min) = update.min_participants {
            self.min_participants = min;
        }
        if let Some(deadline) = update.deadline {
            self.deadline = deadline;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_ready(&mut self, now: DateTime<Utc>) {
        self.status = GroupBuyStatus::Ready;
        self.updated_at = now;
    }

    pub fn set_visible(&mut self, visible: bool, now: DateTime<Utc>) {
        self.visible = visible;
        self.updated_at = now;
    }

    /// Listed publicly while visible and before the deadline.
    pub fn is_listed(&self, now: DateTime<Utc>) -> bool {
        self.visible && self.deadline >= now
    }
}

// ===== Request DTOs =====

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupBuyRequest {
    #[validate(custom = "not_blank")]
    pub title: String,
    pub description: Option<String>,
    pub price_per_unit: f64,
    #[validate(range(min = 1))]
    pub min_participants: u32,
    pub deadline: DateTime<Utc>,
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupBuyRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_per_unit: Option<f64>,
    #[validate(range(min = 1))]
    pub min_participants: Option<u32>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupBuyRequest {
    #[serde(default)]
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayGroupBuyRequest {
    pub phone: String,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PhoneBody {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGroupBuyQuery {
    pub seller_id: Option<Uuid>,
}

// ===== Response views =====

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBuyProductView {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidParticipantView {
    pub phone: String,
    pub quantity: u32,
    pub paid_at: DateTime<Utc>,
    pub added_to_cart: bool,
    pub ordered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBuyView {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub product: Option<GroupBuyProductView>,
    pub title: String,
    pub description: String,
    pub price_per_unit: f64,
    pub min_participants: u32,
    pub deadline: DateTime<Utc>,
    pub visible: bool,
    pub status: GroupBuyStatus,
    pub participants: Vec<Participant>,
    pub paid_participants: Vec<PaidParticipantView>,
    pub joined_quantity: u32,
    pub is_full: bool,
    pub created_at: DateTime<Utc>,
}

impl GroupBuyView {
    pub fn new(group: &GroupBuy, product: Option<&Product>) -> Self {
        Self {
            id: group.id,
            seller_id: group.seller_id,
            product: product.map(|p| GroupBuyProductView {
                id: p.id,
                name: p.name.clone(),
                price: p.price,
                images: p.images.clone(),
            }),
            title: group.title.clone(),
            description: group.description.clone(),
            price_per_unit: group.price_per_unit,
            min_participants: group.min_participants,
            deadline: group.deadline,
            visible: group.visible,
            status: group.status,
            participants: group.participants.clone(),
            paid_participants: group
                .paid_participants
                .iter()
                .map(|p| PaidParticipantView {
                    phone: p.phone.clone(),
                    quantity: p.quantity,
                    paid_at: p.paid_at,
                    added_to_cart: p.lifecycle.added_to_cart(),
                    ordered: p.lifecycle.ordered(),
                })
                .collect(),
            joined_quantity: group.joined_quantity(),
            is_full: group.is_full(),
            created_at: group.created_at,
        }
    }
}

/// Paid participation ready for a cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBuyItemView {
    pub group_buy_id: Uuid,
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub product_name: String,
    pub price: f64,
    pub quantity: u32,
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn group(min: u32) -> GroupBuy {
        let now = Utc::now();
        GroupBuy::new(
            Uuid::new_v4(),
            CreateGroupBuyRequest {
                title: "Rice bags".into(),
                description: None,
                price_per_unit: 500.0,
                min_participants: min,
                deadline: now + Duration::days(3),
                product_id: Uuid::new_v4(),
            },
            now,
        )
    }

    #[test]
    fn join_rejects_bad_quantity_and_duplicates() {
        let now = Utc::now();
        let mut g = group(10);
        assert_eq!(g.join("A", "0801", 0, now), Err(GroupBuyError::InvalidQuantity));
        assert_eq!(g.join("A", "0801", -2, now), Err(GroupBuyError::InvalidQuantity));
        g.join("A", "0801", 4, now).unwrap();
        assert_eq!(g.join("A", "0801", 1, now), Err(GroupBuyError::AlreadyJoined));
    }

    #[test]
    fn oversubscription_discloses_remaining_slots() {
        let now = Utc::now();
        let mut g = group(10);
        g.join("A", "0801", 7, now).unwrap();
        let err = g.join("B", "0802", 4, now).unwrap_err();
        assert_eq!(err, GroupBuyError::NotEnoughSlots(3));
        assert_eq!(err.to_string(), "Only 3 slots left");
    }

    #[test]
    fn crossing_threshold_flips_to_full_once() {
        let now = Utc::now();
        let mut g = group(5);
        g.join("A", "0801", 2, now).unwrap();
        assert_eq!(g.status, GroupBuyStatus::Open);
        assert!(!g.is_full());

        g.join("B", "0802", 3, now).unwrap();
        assert_eq!(g.status, GroupBuyStatus::Full);
        assert!(g.is_full());
        assert_eq!(g.join("C", "0803", 1, now), Err(GroupBuyError::Full));

        g.pay("0801", None, now).unwrap();
        assert!(g.is_full());
        assert_eq!(g.status, GroupBuyStatus::Full);
    }

    #[test]
    fn joined_quantity_spans_both_lists() {
        let now = Utc::now();
        let mut g = group(10);
        g.join("A", "0801", 2, now).unwrap();
        g.join("B", "0802", 3, now).unwrap();
        g.pay("0801", None, now).unwrap();
        assert_eq!(g.participants.len(), 2);
        assert_eq!(g.paid_participants.len(), 1);
        assert_eq!(g.joined_quantity(), 7);
    }

    #[test]
    fn payment_counts_toward_threshold_and_blocks_later_joins() {
        let now = Utc::now();
        let mut g = group(5);
        g.join("A", "0801", 3, now).unwrap();
        assert!(!g.is_full());

        g.pay("0801", None, now).unwrap();
        assert_eq!(g.participants.len(), 1);
        assert_eq!(g.joined_quantity(), 6);
        assert_eq!(g.slots_left(), 0);
        assert!(g.is_full());
        assert_eq!(g.status, GroupBuyStatus::Full);
        assert_eq!(g.join("B", "0802", 2, now), Err(GroupBuyError::Full));
    }

    #[test]
    fn pay_requires_join_and_happens_once() {
        let now = Utc::now();
        let mut g = group(10);
        assert_eq!(g.pay("0801", None, now).unwrap_err(), GroupBuyError::NotJoined);

        g.join("A", "0801", 2, now).unwrap();
        let paid = g.pay("0801", Some(3), now).unwrap();
        assert_eq!(paid.quantity, 3);
        assert_eq!(g.pay("0801", None, now).unwrap_err(), GroupBuyError::AlreadyPaid);
        assert_eq!(g.join("A", "0801", 1, now), Err(GroupBuyError::AlreadyJoined));
    }

    #[test]
    fn cart_reservation_requires_payment_and_happens_once() {
        let now = Utc::now();
        let mut g = group(10);
        g.join("A", "0801", 2, now).unwrap();
        assert_eq!(g.reserve_for_cart("0801", now), Err(GroupBuyError::NotPaid));

        g.pay("0801", None, now).unwrap();
        assert_eq!(g.reserve_for_cart("0801", now), Ok(2));
        assert_eq!(g.reserve_for_cart("0801", now), Err(GroupBuyError::AlreadyInCart));
        assert!(g.pending_pickup("0801").is_none());

        g.consume("0801", "TRADY-1", now).unwrap();
        assert!(g.paid("0801").unwrap().lifecycle.ordered());
    }

    #[test]
    fn terms_are_frozen_once_someone_joins() {
        let now = Utc::now();
        let mut g = group(10);
        let update = || UpdateGroupBuyRequest {
            title: Some("Beans".into()),
            description: None,
            price_per_unit: Some(450.0),
            min_participants: None,
            deadline: None,
        };
        g.update_terms(update(), now).unwrap();
        assert_eq!(g.price_per_unit, 450.0);

        g.join("A", "0801", 1, now).unwrap();
        assert_eq!(g.update_terms(update(), now), Err(GroupBuyError::HasParticipants));
    }
}
