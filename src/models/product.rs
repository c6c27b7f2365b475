use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product owned by a seller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub price: f64,
    pub stock: u32,
    #[serde(default)]
    pub sold: u32,
    #[serde(default)]
    pub is_bargainable: bool,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(seller_id: Uuid, name: impl Into<String>, price: f64, stock: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            seller_id,
            name: name.into(),
            price,
            stock,
            sold: 0,
            is_bargainable: false,
            images: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn bargainable(mut self) -> Self {
        self.is_bargainable = true;
        self
    }

    pub fn image_url(&self) -> String {
        self.images.first().cloned().unwrap_or_default()
    }

    /// Takes `quantity` units out of stock, or leaves the product untouched.
    pub fn take_stock(&mut self, quantity: u32) -> bool {
        if self.stock < quantity {
            return false;
        }
        self.stock -= quantity;
        self.sold = self.sold.saturating_add(quantity);
        true
    }
}
