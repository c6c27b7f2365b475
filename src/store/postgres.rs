use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{Database, StoreError, StoreResult, Tx};
use crate::models::{Bargain, Cart, GroupBuy, Order, Product, Storefront};

/// Postgres-backed store: one JSONB document per record plus the key
/// columns the lookups filter on.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn begin(&self) -> StoreResult<Box<dyn Tx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx: Some(tx) }))
    }
}

pub struct PgTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    fn conn(&mut self) -> StoreResult<&mut PgConnection> {
        self.tx.as_deref_mut().ok_or(StoreError::Finished)
    }

    async fn fetch_doc<T>(&mut self, sql: &str, key: impl ToString) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin + 'static,
    {
        let row = sqlx::query_as::<_, (Json<T>,)>(sql)
            .bind(key.to_string())
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.map(|(Json(doc),)| doc))
    }

    async fn fetch_docs<T>(&mut self, sql: &str, key: Option<String>) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Unpin + 'static,
    {
        let mut query = sqlx::query_as::<_, (Json<T>,)>(sql);
        if let Some(key) = key {
            query = query.bind(key);
        }
        let rows = query.fetch_all(self.conn()?).await?;
        Ok(rows.into_iter().map(|(Json(doc),)| doc).collect())
    }

    async fn delete_by_key(&mut self, sql: &str, key: impl ToString) -> StoreResult<bool> {
        let result = sqlx::query(sql)
            .bind(key.to_string())
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Tx for PgTx {
    async fn product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        self.fetch_doc("SELECT doc FROM products WHERE id = $1::uuid FOR UPDATE", id)
            .await
    }

    async fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET seller_id = EXCLUDED.seller_id, doc = EXCLUDED.doc
            "#,
        )
        .bind(product.id)
        .bind(product.seller_id)
        .bind(Json(product))
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn storefront(&mut self, seller_id: Uuid) -> StoreResult<Option<Storefront>> {
        self.fetch_doc(
            "SELECT doc FROM storefronts WHERE seller_id = $1::uuid FOR UPDATE",
            seller_id,
        )
        .await
    }

    async fn storefronts(&mut self) -> StoreResult<Vec<Storefront>> {
        self.fetch_docs("SELECT doc FROM storefronts ORDER BY seller_id", None)
            .await
    }

    async fn save_storefront(&mut self, storefront: &Storefront) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO storefronts (seller_id, doc)
            VALUES ($1, $2)
            ON CONFLICT (seller_id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(storefront.seller_id)
        .bind(Json(storefront))
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn bargain(&mut self, id: Uuid) -> StoreResult<Option<Bargain>> {
        self.fetch_doc("SELECT doc FROM bargains WHERE id = $1::uuid FOR UPDATE", id)
            .await
    }

    async fn bargains_by_buyer(&mut self, buyer_phone: &str) -> StoreResult<Vec<Bargain>> {
        self.fetch_docs(
            "SELECT doc FROM bargains WHERE buyer_phone = $1 ORDER BY created_at FOR UPDATE",
            Some(buyer_phone.to_string()),
        )
        .await
    }

    async fn bargains_by_seller(&mut self, seller_id: Uuid) -> StoreResult<Vec<Bargain>> {
        self.fetch_docs(
            "SELECT doc FROM bargains WHERE seller_id = $1::uuid ORDER BY created_at",
            Some(seller_id.to_string()),
        )
        .await
    }

    async fn save_bargain(&mut self, bargain: &Bargain) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bargains (id, seller_id, buyer_phone, status, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status, doc = EXCLUDED.doc
            "#,
        )
        .bind(bargain.id)
        .bind(bargain.seller_id)
        .bind(&bargain.buyer_phone)
        .bind(bargain.status.as_str())
        .bind(bargain.created_at)
        .bind(Json(bargain))
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn delete_bargain(&mut self, id: Uuid) -> StoreResult<bool> {
        self.delete_by_key("DELETE FROM bargains WHERE id = $1::uuid", id)
            .await
    }

    async fn group_buy(&mut self, id: Uuid) -> StoreResult<Option<GroupBuy>> {
        self.fetch_doc("SELECT doc FROM group_buys WHERE id = $1::uuid FOR UPDATE", id)
            .await
    }

    async fn group_buys(&mut self) -> StoreResult<Vec<GroupBuy>> {
        self.fetch_docs("SELECT doc FROM group_buys ORDER BY created_at", None)
            .await
    }

    async fn group_buys_by_seller(&mut self, seller_id: Uuid) -> StoreResult<Vec<GroupBuy>> {
        self.fetch_docs(
            "SELECT doc FROM group_buys WHERE seller_id = $1::uuid ORDER BY created_at",
            Some(seller_id.to_string()),
        )
        .await
    }

    async fn group_buys_by_paid_phone(&mut self, phone: &str) -> StoreResult<Vec<GroupBuy>> {
        self.fetch_docs(
            r#"
            SELECT doc FROM group_buys
            WHERE doc->'paidParticipants' @> jsonb_build_array(jsonb_build_object('phone', $1::text))
            ORDER BY created_at
            FOR UPDATE
            "#,
            Some(phone.to_string()),
        )
        .await
    }

    async fn save_group_buy(&mut self, group_buy: &GroupBuy) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO group_buys (id, seller_id, deadline, created_at, doc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET deadline = EXCLUDED.deadline, doc = EXCLUDED.doc
            "#,
        )
        .bind(group_buy.id)
        .bind(group_buy.seller_id)
        .bind(group_buy.deadline)
        .bind(group_buy.created_at)
        .bind(Json(group_buy))
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn delete_group_buy(&mut self, id: Uuid) -> StoreResult<bool> {
        self.delete_by_key("DELETE FROM group_buys WHERE id = $1::uuid", id)
            .await
    }

    async fn cart(&mut self, buyer_phone: &str) -> StoreResult<Option<Cart>> {
        self.fetch_doc(
            "SELECT doc FROM carts WHERE buyer_phone = $1 FOR UPDATE",
            buyer_phone,
        )
        .await
    }

    async fn save_cart(&mut self, cart: &Cart) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (buyer_phone, doc)
            VALUES ($1, $2)
            ON CONFLICT (buyer_phone) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(&cart.buyer_phone)
        .bind(Json(cart))
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn delete_cart(&mut self, buyer_phone: &str) -> StoreResult<bool> {
        self.delete_by_key("DELETE FROM carts WHERE buyer_phone = $1", buyer_phone)
            .await
    }

    async fn order(&mut self, order_id: &str) -> StoreResult<Option<Order>> {
        self.fetch_doc("SELECT doc FROM orders WHERE order_id = $1 FOR UPDATE", order_id)
            .await
    }

    async fn orders(&mut self) -> StoreResult<Vec<Order>> {
        self.fetch_docs("SELECT doc FROM orders ORDER BY created_at", None)
            .await
    }

    async fn orders_by_buyer(&mut self, buyer_phone: &str) -> StoreResult<Vec<Order>> {
        self.fetch_docs(
            "SELECT doc FROM orders WHERE buyer_phone = $1 ORDER BY created_at",
            Some(buyer_phone.to_string()),
        )
        .await
    }

    async fn orders_by_seller(&mut self, seller_id: Uuid) -> StoreResult<Vec<Order>> {
        self.fetch_docs(
            r#"
            SELECT doc FROM orders
            WHERE doc->'products' @> jsonb_build_array(jsonb_build_object('sellerId', $1::text))
            ORDER BY created_at
            "#,
            Some(seller_id.to_string()),
        )
        .await
    }

    async fn orders_created_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, (Json<Order>,)>(
            "SELECT doc FROM orders WHERE created_at >= $1 AND created_at < $2 ORDER BY created_at",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.conn()?)
        .await?;
        Ok(rows.into_iter().map(|(Json(order),)| order).collect())
    }

    async fn save_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_id, buyer_phone, created_at, doc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(order.id)
        .bind(&order.order_id)
        .bind(&order.buyer_phone)
        .bind(order.created_at)
        .bind(Json(order))
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.commit().await?;
        Ok(())
    }
}
