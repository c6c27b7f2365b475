//! Business logic services

pub mod bargain_service;
pub mod cart_service;
pub mod catalog;
pub mod group_buy_service;
pub mod order_service;
pub mod tracking_service;

pub use bargain_service::BargainService;
pub use cart_service::CartService;
pub use group_buy_service::GroupBuyService;
pub use order_service::OrderService;
pub use tracking_service::TrackingService;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{Claims, Role};
use crate::models::Order;

/// Seller or admin acting on an order after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staff {
    Seller(Uuid),
    Admin,
}

impl Staff {
    pub fn from_claims(claims: &Claims) -> AppResult<Self> {
        match claims.role {
            Role::Admin => Ok(Self::Admin),
            Role::Seller => claims
                .account_id()
                .map(Self::Seller)
                .ok_or_else(|| AppError::unauthorized("Invalid or expired token")),
            _ => Err(AppError::forbidden("Access denied. seller or admin role required.")),
        }
    }

    /// Sellers may only touch orders containing one of their products.
    pub fn authorize(&self, order: &Order) -> AppResult<()> {
        match self {
            Self::Admin => Ok(()),
            Self::Seller(seller_id) if order.involves_seller(*seller_id) => Ok(()),
            Self::Seller(_) => Err(AppError::forbidden("Not authorized to update this order")),
        }
    }
}
