//! Scheduled batch jobs

pub mod top_sellers;

pub use top_sellers::{TopSellerJob, TopSellerWindow};
