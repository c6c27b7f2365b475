use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seller storefront: location snapshot source and reputation holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storefront {
    pub seller_id: Uuid,
    pub store_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_top_seller: bool,
    #[serde(default)]
    pub seller_score: f64,
    pub updated_at: DateTime<Utc>,
}

impl Storefront {
    pub fn new(seller_id: Uuid, store_name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            seller_id,
            store_name: store_name.into(),
            location: location.into(),
            is_top_seller: false,
            seller_score: 0.0,
            updated_at: Utc::now(),
        }
    }
}
