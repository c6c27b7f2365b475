//! Route definitions for the Trady API

mod bargain;
mod cart;
mod group_buy;
mod order;
mod tracking;

pub use bargain::bargain_routes;
pub use cart::cart_routes;
pub use group_buy::group_buy_routes;
pub use order::order_routes;
pub use tracking::tracking_routes;
