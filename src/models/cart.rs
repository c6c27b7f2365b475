use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::Product;

/// Cart line with price and seller details snapshotted at insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    #[serde(default)]
    pub product_name: String,
    pub seller_id: Option<Uuid>,
    #[serde(default)]
    pub seller_location: String,
    pub quantity: u32,
    pub price: f64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub is_bargain: bool,
    #[serde(default)]
    pub is_group_buy: bool,
    #[serde(default)]
    pub bargain_id: Option<Uuid>,
    #[serde(default)]
    pub group_buy_id: Option<Uuid>,
}

/// Merge identity of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub product_id: Uuid,
    pub is_bargain: bool,
    pub is_group_buy: bool,
    pub bargain_id: Option<Uuid>,
    pub group_buy_id: Option<Uuid>,
}

impl CartItem {
    /// Plain line priced at `price`, with product and seller details copied in.
    pub fn snapshot(product: &Product, seller_location: &str, quantity: u32, price: f64) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            seller_id: Some(product.seller_id),
            seller_location: seller_location.to_string(),
            quantity,
            price,
            image_url: product.image_url(),
            is_bargain: false,
            is_group_buy: false,
            bargain_id: None,
            group_buy_id: None,
        }
    }

    pub fn from_bargain(mut self, bargain_id: Uuid) -> Self {
        self.is_bargain = true;
        self.bargain_id = Some(bargain_id);
        self
    }

    pub fn from_group_buy(mut self, group_buy_id: Uuid) -> Self {
        self.is_group_buy = true;
        self.group_buy_id = Some(group_buy_id);
        self
    }

    pub fn key(&self) -> CartKey {
        CartKey {
            product_id: self.product_id,
            is_bargain: self.is_bargain,
            is_group_buy: self.is_group_buy,
            bargain_id: self.bargain_id,
            group_buy_id: self.group_buy_id,
        }
    }

    /// Plain line: no negotiated or pooled source behind it.
    pub fn is_plain(&self) -> bool {
        self.bargain_id.is_none() && self.group_buy_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub buyer_phone: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(buyer_phone: &str, now: DateTime<Utc>) -> Self {
        Self {
            buyer_phone: buyer_phone.to_string(),
            items: Vec::new(),
            updated_at: now,
        }
    }

    /// Inserts `item`, or overwrites the line holding the same key in place.
    pub fn upsert(&mut self, item: CartItem) {
        let key = item.key();
        match self.items.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Single-item add: the first line of the same product is replaced
    /// whatever its flags, so a repeated add can flip `is_bargain`.
    pub fn upsert_product(&mut self, item: CartItem) {
        match self
            .items
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Folds each source into the cart in turn; later sources win on a key
    /// collision while the line keeps its first position.
    pub fn merge<I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = Vec<CartItem>>,
    {
        for source in sources {
            for item in source {
                self.upsert(item);
            }
        }
    }

    pub fn contains_bargain(&self, bargain_id: Uuid) -> bool {
        self.items.iter().any(|item| item.bargain_id == Some(bargain_id))
    }

    pub fn contains_group_buy(&self, group_buy_id: Uuid) -> bool {
        self.items
            .iter()
            .any(|item| item.group_buy_id == Some(group_buy_id))
    }

    /// Drops every line for `product_id`; returns how many were removed.
    pub fn remove_product(&mut self, product_id: Uuid) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.product_id != product_id);
        before - self.items.len()
    }
}

// ===== Request DTOs =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub buyer_phone: String,
    pub product_id: Uuid,
    pub quantity: i64,
    pub price: f64,
    #[serde(default)]
    pub is_bargain: bool,
}

/// Line as the client holds it; missing snapshots are filled server side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCartItem {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub seller_id: Option<Uuid>,
    pub seller_location: Option<String>,
    pub quantity: u32,
    pub price: f64,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_bargain: bool,
    #[serde(default)]
    pub is_group_buy: bool,
    pub bargain_id: Option<Uuid>,
    pub group_buy_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCartRequest {
    pub cart_items: Vec<ClientCartItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCartRequest {
    pub buyer_phone: String,
}
