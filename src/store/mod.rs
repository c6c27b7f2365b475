//! Document storage behind a unit-of-work interface.
//!
//! Every service operation opens one [`Tx`], reads what it needs, applies its
//! domain logic and writes back before [`Tx::commit`]. Dropping a `Tx` without
//! committing discards everything it wrote.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Bargain, Cart, GroupBuy, Order, Product, Storefront};

pub mod memory;
pub mod postgres;

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("transaction already finished")]
    Finished,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn Tx>>;
}

#[async_trait]
pub trait Tx: Send {
    // Catalog
    async fn product(&mut self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn save_product(&mut self, product: &Product) -> StoreResult<()>;

    // Storefronts
    async fn storefront(&mut self, seller_id: Uuid) -> StoreResult<Option<Storefront>>;
    async fn storefronts(&mut self) -> StoreResult<Vec<Storefront>>;
    async fn save_storefront(&mut self, storefront: &Storefront) -> StoreResult<()>;

    // Bargains
    async fn bargain(&mut self, id: Uuid) -> StoreResult<Option<Bargain>>;
    async fn bargains_by_buyer(&mut self, buyer_phone: &str) -> StoreResult<Vec<Bargain>>;
    async fn bargains_by_seller(&mut self, seller_id: Uuid) -> StoreResult<Vec<Bargain>>;
    async fn save_bargain(&mut self, bargain: &Bargain) -> StoreResult<()>;
    async fn delete_bargain(&mut self, id: Uuid) -> StoreResult<bool>;

    // Group buys
    async fn group_buy(&mut self, id: Uuid) -> StoreResult<Option<GroupBuy>>;
    async fn group_buys(&mut self) -> StoreResult<Vec<GroupBuy>>;
    async fn group_buys_by_seller(&mut self, seller_id: Uuid) -> StoreResult<Vec<GroupBuy>>;
    async fn group_buys_by_paid_phone(&mut self, phone: &str) -> StoreResult<Vec<GroupBuy>>;
    async fn save_group_buy(&mut self, group_buy: &GroupBuy) -> StoreResult<()>;
    async fn delete_group_buy(&mut self, id: Uuid) -> StoreResult<bool>;

    // Carts
    async fn cart(&mut self, buyer_phone: &str) -> StoreResult<Option<Cart>>;
    async fn save_cart(&mut self, cart: &Cart) -> StoreResult<()>;
    async fn delete_cart(&mut self, buyer_phone: &str) -> StoreResult<bool>;

    // Orders
    async fn order(&mut self, order_id: &str) -> StoreResult<Option<Order>>;
    async fn orders(&mut self) -> StoreResult<Vec<Order>>;
    async fn orders_by_buyer(&mut self, buyer_phone: &str) -> StoreResult<Vec<Order>>;
    async fn orders_by_seller(&mut self, seller_id: Uuid) -> StoreResult<Vec<Order>>;
    async fn orders_created_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Order>>;
    async fn save_order(&mut self, order: &Order) -> StoreResult<()>;

    async fn commit(&mut self) -> StoreResult<()>;
}
