//! Data models for the Trady marketplace backend

use serde::{Deserialize, Serialize};
use validator::ValidationError;

pub mod bargain;
pub mod cart;
pub mod group_buy;
pub mod lifecycle;
pub mod order;
pub mod phone;
pub mod product;
pub mod storefront;

pub use bargain::*;
pub use cart::*;
pub use group_buy::*;
pub use lifecycle::SourceLifecycle;
pub use order::*;
pub use phone::normalize_phone;
pub use product::Product;
pub use storefront::Storefront;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            error: Some(error.into()),
        }
    }
}

/// `validator` hook rejecting empty or whitespace-only strings.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

impl ApiResponse<()> {
    /// Success body carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
        }
    }
}
