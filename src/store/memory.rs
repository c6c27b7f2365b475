use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Database, StoreError, StoreResult, Tx};
use crate::models::{Bargain, Cart, GroupBuy, Order, Product, Storefront};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    storefronts: HashMap<Uuid, Storefront>,
    bargains: HashMap<Uuid, Bargain>,
    group_buys: HashMap<Uuid, GroupBuy>,
    carts: HashMap<String, Cart>,
    orders: HashMap<String, Order>,
}

/// In-process store. Transactions are serialized: `begin` holds the lock
/// until the transaction commits or drops, so a task must never open a
/// second transaction while holding one.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn seed_storefront(&self, storefront: Storefront) {
        self.state
            .lock()
            .await
            .storefronts
            .insert(storefront.seller_id, storefront);
    }

    pub async fn seed_order(&self, order: Order) {
        self.state
            .lock()
            .await
            .orders
            .insert(order.order_id.clone(), order);
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn begin(&self) -> StoreResult<Box<dyn Tx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working: Some(working),
        }))
    }
}

/// Copy-on-begin working set; `commit` swaps it into the shared state.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: Option<MemoryState>,
}

impl MemoryTx {
    fn state(&mut self) -> StoreResult<&mut MemoryState> {
        self.working.as_mut().ok_or(StoreError::Finished)
    }
}

fn sorted_by_creation<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by_key(|item| created_at(item));
    items
}

#[async_trait]
impl Tx for MemoryTx {
    async fn product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.state()?.products.get(&id).cloned())
    }

    async fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        self.state()?.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn storefront(&mut self, seller_id: Uuid) -> StoreResult<Option<Storefront>> {
        Ok(self.state()?.storefronts.get(&seller_id).cloned())
    }

    async fn storefronts(&mut self) -> StoreResult<Vec<Storefront>> {
        let mut stores: Vec<Storefront> = self.state()?.storefronts.values().cloned().collect();
        stores.sort_by_key(|store| store.seller_id);
        Ok(stores)
    }

    async fn save_storefront(&mut self, storefront: &Storefront) -> StoreResult<()> {
        self.state()?
            .storefronts
            .insert(storefront.seller_id, storefront.clone());
        Ok(())
    }

    async fn bargain(&mut self, id: Uuid) -> StoreResult<Option<Bargain>> {
        Ok(self.state()?.bargains.get(&id).cloned())
    }

    async fn bargains_by_buyer(&mut self, buyer_phone: &str) -> StoreResult<Vec<Bargain>> {
        let found = self
            .state()?
            .bargains
            .values()
            .filter(|b| b.buyer_phone == buyer_phone)
            .cloned()
            .collect();
        Ok(sorted_by_creation(found, |b: &Bargain| b.created_at))
    }

    async fn bargains_by_seller(&mut self, seller_id: Uuid) -> StoreResult<Vec<Bargain>> {
        let found = self
            .state()?
            .bargains
            .values()
            .filter(|b| b.seller_id == seller_id)
            .cloned()
            .collect();
        Ok(sorted_by_creation(found, |b: &Bargain| b.created_at))
    }

    async fn save_bargain(&mut self, bargain: &Bargain) -> StoreResult<()> {
        self.state()?.bargains.insert(bargain.id, bargain.clone());
        Ok(())
    }

    async fn delete_bargain(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state()?.bargains.remove(&id).is_some())
    }

    async fn group_buy(&mut self, id: Uuid) -> StoreResult<Option<GroupBuy>> {
        Ok(self.state()?.group_buys.get(&id).cloned())
    }

    async fn group_buys(&mut self) -> StoreResult<Vec<GroupBuy>> {
        let found = self.state()?.group_buys.values().cloned().collect();
        Ok(sorted_by_creation(found, |g: &GroupBuy| g.created_at))
    }

    async fn group_buys_by_seller(&mut self, seller_id: Uuid) -> StoreResult<Vec<GroupBuy>> {
        let found = self
            .state()?
            .group_buys
            .values()
            .filter(|g| g.seller_id == seller_id)
            .cloned()
            .collect();
        Ok(sorted_by_creation(found, |g: &GroupBuy| g.created_at))
    }

    async fn group_buys_by_paid_phone(&mut self, phone: &str) -> StoreResult<Vec<GroupBuy>> {
        let found = self
            .state()?
            .group_buys
            .values()
            .filter(|g| g.paid(phone).is_some())
            .cloned()
            .collect();
        Ok(sorted_by_creation(found, |g: &GroupBuy| g.created_at))
    }

    async fn save_group_buy(&mut self, group_buy: &GroupBuy) -> StoreResult<()> {
        self.state()?
            .group_buys
            .insert(group_buy.id, group_buy.clone());
        Ok(())
    }

    async fn delete_group_buy(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state()?.group_buys.remove(&id).is_some())
    }

    async fn cart(&mut self, buyer_phone: &str) -> StoreResult<Option<Cart>> {
        Ok(self.state()?.carts.get(buyer_phone).cloned())
    }

    async fn save_cart(&mut self, cart: &Cart) -> StoreResult<()> {
        self.state()?
            .carts
            .insert(cart.buyer_phone.clone(), cart.clone());
        Ok(())
    }

    async fn delete_cart(&mut self, buyer_phone: &str) -> StoreResult<bool> {
        Ok(self.state()?.carts.remove(buyer_phone).is_some())
    }

    async fn order(&mut self, order_id: &str) -> StoreResult<Option<Order>> {
        Ok(self.state()?.orders.get(order_id).cloned())
    }

    async fn orders(&mut self) -> StoreResult<Vec<Order>> {
        let found = self.state()?.orders.values().cloned().collect();
        Ok(sorted_by_creation(found, |o: &Order| o.created_at))
    }

    async fn orders_by_buyer(&mut self, buyer_phone: &str) -> StoreResult<Vec<Order>> {
        let found = self
            .state()?
            .orders
            .values()
            .filter(|o| o.buyer_phone == buyer_phone)
            .cloned()
            .collect();
        Ok(sorted_by_creation(found, |o: &Order| o.created_at))
    }

    async fn orders_by_seller(&mut self, seller_id: Uuid) -> StoreResult<Vec<Order>> {
        let found = self
            .state()?
            .orders
            .values()
            .filter(|o| o.involves_seller(seller_id))
            .cloned()
            .collect();
        Ok(sorted_by_creation(found, |o: &Order| o.created_at))
    }

    async fn orders_created_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Order>> {
        let found = self
            .state()?
            .orders
            .values()
            .filter(|o| o.created_at >= start && o.created_at < end)
            .cloned()
            .collect();
        Ok(sorted_by_creation(found, |o: &Order| o.created_at))
    }

    async fn save_order(&mut self, order: &Order) -> StoreResult<()> {
        self.state()?
            .orders
            .insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let working = self.working.take().ok_or(StoreError::Finished)?;
        *self.guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let db = MemoryDatabase::new();
        let product = Product::new(Uuid::new_v4(), "Garri", 300.0, 10);
        {
            let mut tx = db.begin().await.unwrap();
            tx.save_product(&product).await.unwrap();
        }
        let mut tx = db.begin().await.unwrap();
        assert!(tx.product(product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_the_next_transaction() {
        let db = MemoryDatabase::new();
        let product = Product::new(Uuid::new_v4(), "Garri", 300.0, 10);
        {
            let mut tx = db.begin().await.unwrap();
            tx.save_product(&product).await.unwrap();
            tx.commit().await.unwrap();
            assert!(matches!(tx.commit().await, Err(StoreError::Finished)));
        }
        let mut tx = db.begin().await.unwrap();
        assert_eq!(tx.product(product.id).await.unwrap(), Some(product));
    }
}
