use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a bargain or a paid group-buy seat stands relative to carts and orders.
///
/// `Available -> Reserved -> Consumed`, never backwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SourceLifecycle {
    #[default]
    Available,
    #[serde(rename_all = "camelCase")]
    Reserved {
        buyer_phone: String,
        reserved_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Consumed {
        order_id: String,
        consumed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("already added to cart")]
    AlreadyReserved,
    #[error("not reserved in a cart")]
    NotReserved,
}

impl SourceLifecycle {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved { .. })
    }

    /// Wire view: the source has left the pool of pending items.
    pub fn added_to_cart(&self) -> bool {
        !self.is_available()
    }

    /// Wire view: an order has been placed against the source.
    pub fn ordered(&self) -> bool {
        matches!(self, Self::Consumed { .. })
    }

    pub fn reserve(&mut self, buyer_phone: &str, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if !self.is_available() {
            return Err(LifecycleError::AlreadyReserved);
        }
        *self = Self::Reserved {
            buyer_phone: buyer_phone.to_string(),
            reserved_at: now,
        };
        Ok(())
    }

    pub fn consume(&mut self, order_id: &str, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if !self.is_reserved() {
            return Err(LifecycleError::NotReserved);
        }
        *self = Self::Consumed {
            order_id: order_id.to_string(),
            consumed_at: now,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_forward_only() {
        let now = Utc::now();
        let mut lifecycle = SourceLifecycle::default();
        assert!(!lifecycle.added_to_cart());

        assert_eq!(lifecycle.consume("TRADY-1", now), Err(LifecycleError::NotReserved));

        lifecycle.reserve("0800", now).unwrap();
        assert!(lifecycle.added_to_cart());
        assert!(!lifecycle.ordered());
        assert_eq!(lifecycle.reserve("0800", now), Err(LifecycleError::AlreadyReserved));

        lifecycle.consume("TRADY-1", now).unwrap();
        assert!(lifecycle.ordered());
        assert_eq!(lifecycle.reserve("0800", now), Err(LifecycleError::AlreadyReserved));
    }

    #[test]
    fn serializes_as_tagged_variant() {
        let json = serde_json::to_value(SourceLifecycle::Available).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "available" }));
    }
}
