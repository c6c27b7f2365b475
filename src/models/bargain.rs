//! Bargain negotiation: offers, counter-offers and their terminal states

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::{LifecycleError, SourceLifecycle};
use super::not_blank;

/// Hard cap on offers per side of a negotiation.
pub const MAX_OFFERS_PER_SIDE: usize = 5;

/// Days a negotiation stays open, counted from creation.
pub const BARGAIN_TTL_DAYS: i64 = 7;

/// Lazy expiry check, evaluated whenever a party tries to act.
pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > created_at + Duration::days(BARGAIN_TTL_DAYS)
}

/// Bargain status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BargainStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Completed,
}

impl BargainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for BargainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Buyer,
    Seller,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buyer => f.write_str("Buyer"),
            Self::Seller => f.write_str("Seller"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseAction {
    Accept,
    Reject,
    Counter,
}

#[derive(Debug, Error, PartialEq)]
pub enum NegotiationError {
    #[error("Cannot respond to a bargain with status '{0}'")]
    NotPending(BargainStatus),
    #[error("Bargain has expired")]
    Expired,
    #[error("{0} offer limit reached")]
    OfferLimit(Party),
    #[error("Bargain not accepted")]
    NotAccepted,
    #[error("Bargain already added to cart")]
    AlreadyAdded,
    #[error("Bargain is not reserved in a cart")]
    NotReserved,
    #[error("No valid accepted items found")]
    NoFinalItems,
    #[error("Cannot delete a bargain with status '{0}'")]
    CannotDelete(BargainStatus),
}

impl From<LifecycleError> for NegotiationError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::AlreadyReserved => Self::AlreadyAdded,
            LifecycleError::NotReserved => Self::NotReserved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferItem {
    pub product_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub quantity: u32,
}

/// One proposal: a set of items for a total price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub items: Vec<OfferItem>,
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub time: DateTime<Utc>,
}

/// Terms a concluded negotiation resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalTerms {
    pub items: Vec<OfferItem>,
    pub price: f64,
}

impl FinalTerms {
    pub fn unit_price(&self) -> f64 {
        let quantity: u32 = self.items.iter().map(|item| item.quantity).sum();
        if quantity == 0 {
            self.price
        } else {
            self.price / f64::from(quantity)
        }
    }
}

/// Bargain record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bargain {
    pub id: Uuid,
    pub buyer_name: String,
    pub buyer_phone: String,
    #[serde(default)]
    pub note: String,
    pub seller_id: Uuid,
    pub buyer_offers: Vec<Offer>,
    #[serde(default)]
    pub seller_offers: Vec<Offer>,
    pub status: BargainStatus,
    pub accepted_price: Option<f64>,
    #[serde(default)]
    pub lifecycle: SourceLifecycle,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bargain {
    pub fn open(
        buyer_name: &str,
        buyer_phone: &str,
        note: &str,
        seller_id: Uuid,
        opening: Offer,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            buyer_name: buyer_name.trim().to_string(),
            buyer_phone: buyer_phone.to_string(),
            note: note.trim().to_string(),
            seller_id,
            buyer_offers: vec![opening],
            seller_offers: Vec::new(),
            status: BargainStatus::Pending,
            accepted_price: None,
            lifecycle: SourceLifecycle::Available,
            order_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn offers(&self, party: Party) -> &[Offer] {
        match party {
            Party::Buyer => &self.buyer_offers,
            Party::Seller => &self.seller_offers,
        }
    }

    /// Gate in front of every response. An expired negotiation flips to
    /// `expired` here; the caller persists that even though it reports failure.
    pub fn ensure_open(&mut self, now: DateTime<Utc>) -> Result<(), NegotiationError> {
        if self.status != BargainStatus::Pending {
            return Err(NegotiationError::NotPending(self.status));
        }
        if is_expired(self.created_at, now) {
            self.status = BargainStatus::Expired;
            self.updated_at = now;
            return Err(NegotiationError::Expired);
        }
        Ok(())
    }

    /// `by` accepts the other side's latest proposal. With no proposal from
    /// the other side the price stays open and final terms fall back to the
    /// latest offer.
    pub fn accept(&mut self, by: Party, now: DateTime<Utc>) {
        let latest = match by {
            Party::Seller => self.buyer_offers.last(),
            Party::Buyer => self.seller_offers.last(),
        };
        self.accepted_price = latest.map(|offer| offer.total_price);
        self.status = BargainStatus::Accepted;
        self.updated_at = now;
    }

    pub fn reject(&mut self, now: DateTime<Utc>) {
        self.status = BargainStatus::Rejected;
        self.updated_at = now;
    }

    pub fn counter(&mut self, by: Party, offer: Offer, now: DateTime<Utc>) -> Result<(), NegotiationError> {
        let offers = match by {
            Party::Buyer => &mut self.buyer_offers,
            Party::Seller => &mut self.seller_offers,
        };
        if offers.len() >= MAX_OFFERS_PER_SIDE {
            return Err(NegotiationError::OfferLimit(by));
        }
        offers.push(offer);
        self.updated_at = now;
        Ok(())
    }

    /// Items and price the negotiation settled on.
    ///
    /// With an accepted price, the first offer (buyer list, then seller list)
    /// carrying exactly that total supplies the items. Without one, the more
    /// recent of the two latest offers wins and ties go to the seller.
    pub fn final_terms(&self) -> Option<FinalTerms> {
        let chosen = match self.accepted_price {
            Some(price) => self
                .buyer_offers
                .iter()
                .chain(self.seller_offers.iter())
                .find(|offer| offer.total_price == price),
            None => match (self.buyer_offers.last(), self.seller_offers.last()) {
                (Some(buyer), Some(seller)) if buyer.time > seller.time => Some(buyer),
                (_, Some(seller)) => Some(seller),
                (Some(buyer), None) => Some(buyer),
                (None, None) => None,
            },
        }?;

        if chosen.items.is_empty() {
            return None;
        }
        Some(FinalTerms {
            items: chosen.items.clone(),
            price: self.accepted_price.unwrap_or(chosen.total_price),
        })
    }

    /// Takes an accepted bargain into the buyer's cart.
    pub fn reserve_for_cart(&mut self, now: DateTime<Utc>) -> Result<FinalTerms, NegotiationError> {
        if self.status != BargainStatus::Accepted {
            return Err(NegotiationError::NotAccepted);
        }
        if !self.lifecycle.is_available() {
            return Err(NegotiationError::AlreadyAdded);
        }
        let terms = self.final_terms().ok_or(NegotiationError::NoFinalItems)?;
        let phone = self.buyer_phone.clone();
        self.lifecycle.reserve(&phone, now)?;
        self.updated_at = now;
        Ok(terms)
    }

    /// Marks the bargain as fulfilled by `order_id`.
    pub fn complete(&mut self, order_id: &str, now: DateTime<Utc>) -> Result<(), NegotiationError> {
        if self.status != BargainStatus::Accepted {
            return Err(NegotiationError::NotAccepted);
        }
        self.lifecycle.consume(order_id, now)?;
        self.status = BargainStatus::Completed;
        self.order_id = Some(order_id.to_string());
        self.updated_at = now;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<(), NegotiationError> {
        if self.status != BargainStatus::Pending {
            return Err(NegotiationError::CannotDelete(self.status));
        }
        Ok(())
    }

    pub fn belongs_to_buyer(&self, phone: &str) -> bool {
        self.buyer_phone.trim().eq_ignore_ascii_case(phone.trim())
    }

    /// Accepted and still waiting to be taken into a cart.
    pub fn is_pending_pickup(&self) -> bool {
        self.status == BargainStatus::Accepted && self.lifecycle.is_available()
    }
}

// ===== Request DTOs =====

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferItemRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartBargainRequest {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub buyer_name: String,
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub buyer_phone: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub items: Vec<OfferItemRequest>,
    #[serde(default)]
    pub total_offered_price: f64,
}

/// Body of both the seller and the buyer respond endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub bargain_id: Uuid,
    pub action: ResponseAction,
    #[serde(default)]
    pub items: Vec<OfferItemRequest>,
    pub total_counter_price: Option<f64>,
    pub note: Option<String>,
    /// Identifies the buyer on the buyer endpoint.
    pub buyer_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerPhoneBody {
    pub buyer_phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerPhoneQuery {
    pub buyer_phone: Option<String>,
}

// ===== Response views =====

/// Full bargain as seen by the seller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BargainView {
    pub id: Uuid,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub note: String,
    pub seller_id: Uuid,
    pub buyer_offers: Vec<Offer>,
    pub seller_offers: Vec<Offer>,
    pub status: BargainStatus,
    pub accepted_price: Option<f64>,
    pub added_to_cart: bool,
    pub ordered: bool,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Bargain> for BargainView {
    fn from(bargain: &Bargain) -> Self {
        Self {
            id: bargain.id,
            buyer_name: bargain.buyer_name.clone(),
            buyer_phone: bargain.buyer_phone.clone(),
            note: bargain.note.clone(),
            seller_id: bargain.seller_id,
            buyer_offers: bargain.buyer_offers.clone(),
            seller_offers: bargain.seller_offers.clone(),
            status: bargain.status,
            accepted_price: bargain.accepted_price,
            added_to_cart: bargain.lifecycle.added_to_cart(),
            ordered: bargain.lifecycle.ordered(),
            order_id: bargain.order_id.clone(),
            created_at: bargain.created_at,
            updated_at: bargain.updated_at,
        }
    }
}

/// Single bargain fetched by the buyer: contact details stripped.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerBargainView {
    pub id: Uuid,
    pub note: String,
    pub seller_id: Uuid,
    pub buyer_offers: Vec<Offer>,
    pub seller_offers: Vec<Offer>,
    pub status: BargainStatus,
    pub accepted_price: Option<f64>,
    pub added_to_cart: bool,
    pub ordered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Bargain> for BuyerBargainView {
    fn from(bargain: &Bargain) -> Self {
        Self {
            id: bargain.id,
            note: bargain.note.clone(),
            seller_id: bargain.seller_id,
            buyer_offers: bargain.buyer_offers.clone(),
            seller_offers: bargain.seller_offers.clone(),
            status: bargain.status,
            accepted_price: bargain.accepted_price,
            added_to_cart: bargain.lifecycle.added_to_cart(),
            ordered: bargain.lifecycle.ordered(),
            created_at: bargain.created_at,
            updated_at: bargain.updated_at,
        }
    }
}

/// Result of a respond call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondOutcome {
    pub bargain_id: Uuid,
    pub status: BargainStatus,
    pub accepted_price: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

impl From<&Bargain> for RespondOutcome {
    fn from(bargain: &Bargain) -> Self {
        Self {
            bargain_id: bargain.id,
            status: bargain.status,
            accepted_price: bargain.accepted_price,
            last_updated: bargain.updated_at,
        }
    }
}

/// One priced line of a concluded bargain, ready for a cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BargainItemView {
    pub bargain_id: Uuid,
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub product_name: String,
    pub price: f64,
    pub quantity: u32,
    pub image_url: String,
}
