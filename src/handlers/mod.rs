//! HTTP handlers for the Trady API

pub mod bargain;
pub mod cart;
pub mod group_buy;
pub mod order;
pub mod tracking;

pub use bargain::*;
pub use cart::*;
pub use group_buy::*;
pub use order::*;
pub use tracking::*;

/// Banner for `GET /`.
pub async fn root() -> &'static str {
    "Trady API Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}
